//! # Handler table
//!
//! Routes each event to the handlers registered for its [`EventKind`]. For one kind, all handlers run
//! `before` in registration order, then `handle` until one returns Stop, then `after` in reverse order.
//! A kind with no registered handlers is ignored.

use std::collections::HashMap;
use std::sync::Arc;

use notifier_core::{Event, EventKind, Handler, HandlerResponse, Result};
use tracing::{debug, info, instrument};

/// Dispatch table keyed by event kind.
#[derive(Clone, Default)]
pub struct HandlerTable {
    routes: HashMap<EventKind, Vec<Arc<dyn Handler>>>,
}

impl HandlerTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Appends a handler for `kind` (runs after handlers registered earlier for the same kind).
    pub fn on(mut self, kind: EventKind, handler: Arc<dyn Handler>) -> Self {
        self.routes.entry(kind).or_default().push(handler);
        self
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.routes.get(&kind).map_or(0, Vec::len)
    }

    /// Dispatches one event. Returns Stop if a handler stopped it, Ignore if no handler is
    /// registered for its kind, Continue otherwise. The first handler error aborts dispatch.
    #[instrument(skip(self, event), fields(event_id = %event.id, kind = %event.kind, source = %event.source))]
    pub async fn dispatch(&self, event: &Event) -> Result<HandlerResponse> {
        let Some(handlers) = self.routes.get(&event.kind) else {
            debug!("no handler registered, event ignored");
            return Ok(HandlerResponse::Ignore);
        };

        debug!(handlers = handlers.len(), "step: dispatch started");

        for handler in handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            if !handler.before(event).await? {
                info!(handler = %handler_name, "step: before returned false, dispatch stopped");
                return Ok(HandlerResponse::Stop);
            }
        }

        let mut final_response = HandlerResponse::Continue;
        for handler in handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            let response = handler.handle(event).await?;
            debug!(handler = %handler_name, response = ?response, "step: handler done");

            match response {
                HandlerResponse::Stop => {
                    info!(handler = %handler_name, "step: dispatch stopped by handler");
                    final_response = response;
                    break;
                }
                HandlerResponse::Continue | HandlerResponse::Ignore => continue,
            }
        }

        for handler in handlers.iter().rev() {
            handler.after(event, &final_response).await?;
        }

        debug!("step: dispatch finished");
        Ok(final_response)
    }
}

// Tests live in tests/handler_table_test.rs
