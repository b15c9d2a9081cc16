//! Flutter-facing boundary for the EduObserva core.

pub mod api;
