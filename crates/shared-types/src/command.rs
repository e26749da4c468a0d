//! The boundary command union.
//!
//! Inbound chat callbacks arrive as strings (`"plan:premium"`,
//! `"check:ORD-..."`). They are decoded once, here, into a closed tagged
//! union; everything past the boundary dispatches on the variant and
//! never sees the string form.

use crate::ids::OrderId;
use crate::plan::PlanType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decoded user command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Main menu.
    Home,
    /// Plan browsing.
    Buy,
    /// Account dashboard.
    AccountDashboard,
    /// Renewal menu.
    Renew,
    /// Support menu.
    Support,
    /// Setup guide.
    Guide,
    /// Show checkout for a plan family.
    SelectPlan(PlanType),
    /// Create an order and a gateway bill for a plan family.
    Pay(PlanType),
    /// Actively poll the gateway for an order ("check payment").
    CheckPayment(OrderId),
    /// Cancel a pending order.
    CancelOrder(OrderId),
    /// Show the usage terms for a paid order.
    ShowRules(OrderId),
    /// Accept terms and trigger provisioning.
    AcceptTerms(OrderId),
    /// Send the access link as text.
    CopyConfig,
    /// Send the access link as a QR image.
    QrConfig,
}

/// Decode failure at the command boundary. Surfaced immediately to the
/// caller, never retried.
#[derive(Debug, Error, PartialEq)]
pub enum CommandParseError {
    /// The token names no known command.
    #[error("unknown command token: {0}")]
    UnknownToken(String),
    /// The token names a command but its argument is malformed.
    #[error("unknown plan family: {0}")]
    UnknownPlan(String),
    /// A command that requires an argument arrived without one.
    #[error("missing argument for command: {0}")]
    MissingArgument(String),
}

impl Command {
    /// Decodes a raw callback token.
    pub fn parse(raw: &str) -> Result<Self, CommandParseError> {
        let raw = raw.trim();
        match raw {
            "home" => return Ok(Self::Home),
            "buy" => return Ok(Self::Buy),
            "account" => return Ok(Self::AccountDashboard),
            "renew" => return Ok(Self::Renew),
            "support" => return Ok(Self::Support),
            "guide" => return Ok(Self::Guide),
            "copycfg" => return Ok(Self::CopyConfig),
            "qrcfg" => return Ok(Self::QrConfig),
            _ => {}
        }

        let (verb, arg) = match raw.split_once(':') {
            Some((v, a)) if !a.is_empty() => (v, a),
            Some((v, _)) => return Err(CommandParseError::MissingArgument(v.to_string())),
            None => return Err(CommandParseError::UnknownToken(raw.to_string())),
        };

        match verb {
            "plan" | "pay" => {
                let plan = PlanType::from_token(arg)
                    .ok_or_else(|| CommandParseError::UnknownPlan(arg.to_string()))?;
                if verb == "plan" {
                    Ok(Self::SelectPlan(plan))
                } else {
                    Ok(Self::Pay(plan))
                }
            }
            "check" => Ok(Self::CheckPayment(OrderId::new(arg))),
            "cancel" => Ok(Self::CancelOrder(OrderId::new(arg))),
            "rules" => Ok(Self::ShowRules(OrderId::new(arg))),
            "agree" => Ok(Self::AcceptTerms(OrderId::new(arg))),
            _ => Err(CommandParseError::UnknownToken(raw.to_string())),
        }
    }
}
