//! Publish-specific post-processing

use crate::event::PublishResult;
use herald_core::{HandlerError, ResultHandler};

/// Turns a broker rejection into a terminal chain error
///
/// Without it an unsuccessful [`PublishResult`] is returned as a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeliveryCheckHandler;

impl ResultHandler<PublishResult> for DeliveryCheckHandler {
    fn name(&self) -> &str {
        "delivery-check"
    }

    fn process(&self, result: PublishResult) -> Result<PublishResult, HandlerError<PublishResult>> {
        if result.success {
            return Ok(result);
        }
        let message = result
            .error
            .clone()
            .unwrap_or_else(|| "delivery not acknowledged".to_string());
        Err(HandlerError::rejected(self.name(), message, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Delivery;
    use std::time::Duration;

    #[test]
    fn test_rejected_delivery_stops_chain() {
        let rejected = PublishResult::from_delivery(
            "t",
            Delivery::Rejected {
                reason: "quota".into(),
            },
            Duration::ZERO,
        );

        let err = DeliveryCheckHandler.process(rejected).unwrap_err();
        assert_eq!(err.handler(), "delivery-check");
        assert_eq!(err.result().error.as_deref(), Some("quota"));
    }

    #[test]
    fn test_accepted_delivery_passes() {
        let accepted = PublishResult::from_delivery(
            "t",
            Delivery::Accepted {
                partition: Some(0),
                offset: Some(3),
            },
            Duration::ZERO,
        );
        assert!(DeliveryCheckHandler.process(accepted).is_ok());
    }
}
