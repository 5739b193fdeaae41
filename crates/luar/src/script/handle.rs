//! Opaque handles
//!
//! A handle pairs one host value (or a reified host type) with the operator
//! table chosen for it at creation. Neither ever changes afterwards.

use std::fmt;
use std::sync::Arc;

use luar_sdk::{HostType, HostValue};

use crate::registry::{OperatorTable, ProxyKind};

#[derive(Debug)]
pub(crate) enum Payload {
    Value(HostValue),
    Type(HostType),
}

struct HandleInner {
    payload: Payload,
    table: Option<Arc<OperatorTable>>,
}

/// Script-visible reference to a host value
#[derive(Clone)]
pub struct Handle(Arc<HandleInner>);

impl Handle {
    pub(crate) fn new(payload: Payload, table: Option<Arc<OperatorTable>>) -> Self {
        Handle(Arc::new(HandleInner { payload, table }))
    }

    pub(crate) fn payload(&self) -> &Payload {
        &self.0.payload
    }

    /// The host value, unless this is a type handle
    pub fn value(&self) -> Option<&HostValue> {
        match &self.0.payload {
            Payload::Value(value) => Some(value),
            Payload::Type(_) => None,
        }
    }

    /// The reified type of a type handle
    pub fn reified_type(&self) -> Option<&HostType> {
        match &self.0.payload {
            Payload::Type(ty) => Some(ty),
            Payload::Value(_) => None,
        }
    }

    /// Operator table; `None` for inert handles
    pub fn table(&self) -> Option<&Arc<OperatorTable>> {
        self.0.table.as_ref()
    }

    /// Proxy kind of the attached table
    pub fn kind(&self) -> Option<ProxyKind> {
        self.0.table.as_ref().map(|t| t.kind())
    }

    /// Whether no operators are attached
    pub fn is_inert(&self) -> bool {
        self.0.table.is_none()
    }

    /// Handle identity (not host identity)
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the handle
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Host type of the payload, for messages
    pub(crate) fn type_name(&self) -> String {
        match &self.0.payload {
            Payload::Value(value) => value.type_name(),
            Payload::Type(ty) => format!("type {}", ty),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &self.kind())
            .field("payload", &self.0.payload)
            .finish()
    }
}
