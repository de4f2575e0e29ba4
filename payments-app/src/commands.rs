//! Newline-delimited JSON command protocol.
//!
//! Each input line is one [`Command`]; each produces one output line:
//! `{"ok":true,...}` on success or `{"ok":false,"error":...,"code":...}`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use payments_hex::PaymentService;
use payments_types::{
    AppError, CreatePaymentRequest, ExchangeRateProvider, OrderPaymentPort, PaymentEvent,
    PaymentId, PaymentRepository,
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Create(CreatePaymentRequest),
    TransactionDetected {
        payment_id: PaymentId,
        transaction_hash: String,
    },
    ConfirmationUpdate {
        payment_id: PaymentId,
        confirmation_count: i64,
    },
    RefundSettlement {
        payment_id: PaymentId,
        #[serde(default)]
        amount: Option<Decimal>,
        transaction_hash: String,
    },
    Refund {
        payment_id: PaymentId,
        #[serde(default)]
        amount: Option<Decimal>,
    },
    RecordRefundHash {
        payment_id: PaymentId,
        transaction_hash: String,
    },
    Confirm {
        payment_id: PaymentId,
    },
    Fail {
        payment_id: PaymentId,
    },
    Cancel {
        payment_id: PaymentId,
    },
    Get {
        payment_id: PaymentId,
    },
    GetByOrder {
        order_id: String,
    },
    ValidateAmount {
        payment_id: PaymentId,
        received: Decimal,
    },
    NotifyOrder {
        payment_id: PaymentId,
    },
    Sweep,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Runs one command against the service.
pub async fn execute<R, X, O>(
    service: &PaymentService<R, X, O>,
    command: Command,
    now: DateTime<Utc>,
) -> Result<Value, AppError>
where
    R: PaymentRepository,
    X: ExchangeRateProvider,
    O: OrderPaymentPort,
{
    let summary = match command {
        Command::Create(req) => service.create_payment(req, now).await?,
        Command::TransactionDetected {
            payment_id,
            transaction_hash,
        } => {
            let event = PaymentEvent::TransactionDetected {
                payment_id,
                transaction_hash,
            };
            service.handle_event(event, now).await?
        }
        Command::ConfirmationUpdate {
            payment_id,
            confirmation_count,
        } => {
            let event = PaymentEvent::ConfirmationUpdate {
                payment_id,
                confirmation_count,
            };
            service.handle_event(event, now).await?
        }
        Command::RefundSettlement {
            payment_id,
            amount,
            transaction_hash,
        } => {
            let event = PaymentEvent::RefundSettlement {
                payment_id,
                amount,
                transaction_hash,
            };
            service.handle_event(event, now).await?
        }
        Command::Refund { payment_id, amount } => {
            service.refund_payment(payment_id, amount, now).await?
        }
        Command::RecordRefundHash {
            payment_id,
            transaction_hash,
        } => {
            service
                .record_refund_hash(payment_id, transaction_hash, now)
                .await?
        }
        Command::Confirm { payment_id } => service.confirm_manually(payment_id, now).await?,
        Command::Fail { payment_id } => service.fail_payment(payment_id, now).await?,
        Command::Cancel { payment_id } => service.cancel_payment(payment_id, now).await?,
        Command::Get { payment_id } => service.get_payment(payment_id, now).await?,
        Command::GetByOrder { order_id } => service.get_payment_by_order(&order_id, now).await?,
        Command::ValidateAmount {
            payment_id,
            received,
        } => {
            service.validate_received_amount(payment_id, received).await?;
            return Ok(json!({ "ok": true, "payment_id": payment_id, "received": received }));
        }
        Command::NotifyOrder { payment_id } => {
            service.notify_order_paid(payment_id).await?;
            return Ok(json!({ "ok": true, "payment_id": payment_id }));
        }
        Command::Sweep => {
            let expired = service.expire_overdue(now).await?;
            return Ok(json!({ "ok": true, "expired": expired }));
        }
    };

    Ok(json!({ "ok": true, "payment": summary }))
}

/// Renders a failed command as an output line.
pub fn error_response(err: &AppError) -> Value {
    json!({ "ok": false, "error": err.to_string(), "code": error_code(err) })
}

/// Renders an unparseable input line as an output line.
pub fn parse_error_response(err: &serde_json::Error) -> Value {
    json!({ "ok": false, "error": format!("invalid command: {}", err), "code": "invalid_command" })
}

fn error_code(err: &AppError) -> Value {
    match err {
        AppError::Domain(e) => json!(e.kind()),
        AppError::NotFound(_) => json!("not_found"),
        AppError::Conflict(_) => json!("conflict"),
        AppError::Exchange(_) => json!("exchange"),
        AppError::Order(_) => json!("order"),
        AppError::Internal(_) => json!("internal"),
    }
}
