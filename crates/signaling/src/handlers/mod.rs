//! Event-Handler fuer den SignalDispatcher

pub mod gruppen_handler;
pub mod ruf_handler;
