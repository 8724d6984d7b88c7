//! Global signals read by the UI shell
//!
//! The payment core itself never touches these; `bind_*` installs listeners
//! that mirror core state into them.

use dioxus::prelude::*;

use crate::services::payment_flow::{FlowState, PaymentFlow};
use crate::stores::session::SessionGate;
use crate::types::{PaymentOutcome, UserProfile};

/// Latest payment flow snapshot
pub static PAYMENT_FLOW: GlobalSignal<FlowState> = Signal::global(FlowState::default);

/// Outcome of the most recent successful payment
pub static LAST_PAYMENT: GlobalSignal<Option<PaymentOutcome>> = Signal::global(|| None);

/// Cached profile of the signed-in user
pub static SESSION_PROFILE: GlobalSignal<Option<UserProfile>> = Signal::global(|| None);

pub fn bind_payment_flow(flow: &PaymentFlow) {
    flow.on_change(Box::new(|state| {
        if let Some(outcome) = &state.outcome {
            *LAST_PAYMENT.write() = Some(outcome.clone());
        }
        *PAYMENT_FLOW.write() = state.clone();
    }));
}

pub fn bind_session(gate: &SessionGate) {
    gate.on_change(Box::new(|profile| {
        *SESSION_PROFILE.write() = profile.cloned();
    }));
}
