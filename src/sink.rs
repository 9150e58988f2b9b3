use log::{debug, log};
use serde::Serialize;

use crate::model::{DecodedField, DumpEvent};

/// Receives the field trace and summary events of a parse, in the order they happen.
pub trait DiagnosticsSink {
    fn field(&mut self, field: &DecodedField);
    fn event(&mut self, event: &DumpEvent);
}

/// Forwards everything to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn field(&mut self, field: &DecodedField) {
        debug!("{}", field);
    }

    fn event(&mut self, event: &DumpEvent) {
        log!(event.level(), "{}", event);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn field(&mut self, _field: &DecodedField) {}
    fn event(&mut self, _event: &DumpEvent) {}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Recorded {
    Field(DecodedField),
    Event(DumpEvent),
}

/// Keeps every reported item, in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub items: Vec<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> impl Iterator<Item = &DecodedField> {
        self.items.iter().filter_map(|item| match item {
            Recorded::Field(f) => Some(f),
            Recorded::Event(_) => None,
        })
    }

    pub fn events(&self) -> impl Iterator<Item = &DumpEvent> {
        self.items.iter().filter_map(|item| match item {
            Recorded::Event(e) => Some(e),
            Recorded::Field(_) => None,
        })
    }
}

impl DiagnosticsSink for RecordingSink {
    fn field(&mut self, field: &DecodedField) {
        self.items.push(Recorded::Field(field.clone()));
    }

    fn event(&mut self, event: &DumpEvent) {
        self.items.push(Recorded::Event(event.clone()));
    }
}
