use log::trace;

use crate::codec::{render_ascii, render_hex};
use crate::err::DumpResult;
use crate::layout::{FieldDescriptor, FieldKind, Layout};
use crate::model::{DecodedField, DumpEvent};
use crate::sink::{DiagnosticsSink, NullSink};
use crate::utils::{ReadExt, ReadSeek};

/// Walks layouts over a byte source, reporting every field to a sink as soon as it is decoded.
///
/// Decoded fields are also retained, so a parse that aborts on a short read still keeps
/// everything read up to that point.
pub struct StructWalker<'s, T: ReadSeek> {
    source: &'s mut T,
    sink: &'s mut dyn DiagnosticsSink,
    max_render_len: usize,
    trace: Vec<DecodedField>,
}

impl<'s, T: ReadSeek> StructWalker<'s, T> {
    pub fn new(
        source: &'s mut T,
        sink: &'s mut dyn DiagnosticsSink,
        max_render_len: usize,
    ) -> Self {
        StructWalker {
            source,
            sink,
            max_render_len,
            trace: Vec::new(),
        }
    }

    /// Reads one field of `field.size` bytes at the cursor.
    ///
    /// Only the bytes are consumed, a nested field is decoded as an opaque span here.
    pub fn decode_field(&mut self, field: &FieldDescriptor) -> DumpResult<DecodedField> {
        self.decode_field_raw(field, self.max_render_len)
            .map(|(decoded, _)| decoded)
    }

    /// Like [`StructWalker::decode_field`], also handing back the raw bytes.
    pub(crate) fn decode_field_raw(
        &mut self,
        field: &FieldDescriptor,
        max_render_len: usize,
    ) -> DumpResult<(DecodedField, Vec<u8>)> {
        let offset = self.source.try_tell()?;
        let data = self.source.try_read_exact(field.size, field.name)?;

        let (contains_printable, ascii) = render_ascii(&data, max_render_len);
        let decoded = DecodedField {
            name: field.name,
            offset,
            size: field.size,
            hex: render_hex(&data, max_render_len),
            ascii,
            contains_printable,
            skipped: field.is_skip(),
        };

        self.sink.field(&decoded);
        self.trace.push(decoded.clone());
        Ok((decoded, data))
    }

    /// Decodes every field of `layout` in order, recursing into nested layouts.
    ///
    /// A nested field is walked through its own layout: the cursor advances by what that layout
    /// decodes, not by the region the field reserves.
    pub fn walk(&mut self, layout: Layout) -> DumpResult<()> {
        for field in layout {
            match field.kind {
                FieldKind::Scalar => {
                    self.decode_field(field)?;
                }
                FieldKind::Nested(nested) => {
                    trace!(
                        "Entering {} at 0x{:08x}",
                        field.name,
                        self.source.try_tell()?
                    );
                    self.walk(nested)?;
                }
            }
        }

        Ok(())
    }

    /// Consumes `len` bytes without decoding them.
    pub fn skip(&mut self, len: usize, what: &'static str) -> DumpResult<()> {
        self.source.try_skip(len, what)
    }

    pub fn emit(&mut self, event: DumpEvent) {
        self.sink.event(&event);
    }

    pub fn position(&mut self) -> DumpResult<u64> {
        self.source.try_tell()
    }

    pub(crate) fn source(&mut self) -> &mut T {
        self.source
    }

    pub(crate) fn max_render_len(&self) -> usize {
        self.max_render_len
    }

    /// Runs `f` and puts the cursor back where it was, on success and on failure alike.
    pub(crate) fn with_restored_position<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> DumpResult<R>,
    ) -> DumpResult<R> {
        let saved = self.source.try_tell()?;
        let result = f(self);

        trace!("Restoring cursor to 0x{saved:08x}");
        let restored = self.source.try_seek_abs(saved);

        match (result, restored) {
            (Err(e), _) | (Ok(_), Err(e)) => Err(e),
            (Ok(v), Ok(_)) => Ok(v),
        }
    }

    pub fn into_trace(self) -> Vec<DecodedField> {
        self.trace
    }
}

/// Decodes `layout` at the current cursor and returns the fields in file order.
pub fn walk<T: ReadSeek>(
    source: &mut T,
    layout: Layout,
    max_render_len: usize,
) -> DumpResult<Vec<DecodedField>> {
    let mut sink = NullSink;
    let mut walker = StructWalker::new(source, &mut sink, max_render_len);
    walker.walk(layout)?;
    Ok(walker.into_trace())
}
