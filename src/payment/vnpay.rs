//! VNPay gateway: signed payment URLs, return handling and refunds.
//!
//! Signing follows VNPay's convention: parameters sorted by name, values
//! form-urlencoded, joined as `k=v&...`, HMAC-SHA512 with the merchant secret,
//! lowercase hex.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use crate::config::VnPayConfig;
use crate::error::AppError;

type HmacSha512 = Hmac<Sha512>;

pub const VERSION: &str = "2.1.0";
pub const COMMAND_PAY: &str = "pay";
pub const COMMAND_REFUND: &str = "refund";
const ORDER_TYPE: &str = "other";
const TRANSACTION_TYPE_FULL_REFUND: &str = "02";
const VN_OFFSET_SECS: i32 = 7 * 3600;
const EXPIRE_MINUTES: i64 = 15;
pub const RETURN_PATH: &str = "/api/v1/payment/vnpay-return";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub status: String,
    pub message: String,
    #[serde(rename = "URL")]
    pub url: String,
}

/// Parameters of a refund request and what VNPay answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundOutcome { pub response_code: String, pub txn_ref: String }

#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize)]
pub struct RefundRequest {
    pub vnp_RequestId: String,
    pub vnp_Version: String,
    pub vnp_Command: String,
    pub vnp_TmnCode: String,
    pub vnp_TransactionType: String,
    pub vnp_TxnRef: String,
    pub vnp_Amount: String,
    pub vnp_OrderInfo: String,
    pub vnp_TransactionNo: String,
    pub vnp_TransactionDate: String,
    pub vnp_CreateBy: String,
    pub vnp_CreateDate: String,
    pub vnp_IpAddr: String,
    pub vnp_SecureHash: String,
}

#[derive(Debug, Deserialize)]
struct RefundReply {
    #[serde(rename = "vnp_ResponseCode")]
    response_code: Option<String>,
}

#[derive(Clone)]
pub struct VnPay {
    config: VnPayConfig,
    backend_url: String,
    frontend_url: String,
    http: reqwest::Client,
}

impl VnPay {
    pub fn new(config: VnPayConfig, backend_url: impl Into<String>, frontend_url: impl Into<String>) -> Self {
        Self {
            config,
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Signed URL sending the customer to the VNPay checkout.
    pub fn create_payment(&self, amount: i64, client_ip: &str, now: DateTime<Utc>) -> Result<PaymentResponse, AppError> {
        if amount <= 0 { return Err(AppError::not_valid("amount must be greater than 0")); }
        let minor_units = amount.checked_mul(100).ok_or_else(|| AppError::not_valid("amount is too large"))?;
        let txn_ref = random_digits(8);
        let created = vn_time(now)?;
        let expires = vn_time(now + Duration::minutes(EXPIRE_MINUTES))?;

        let mut params = BTreeMap::new();
        params.insert("vnp_Version", VERSION.to_string());
        params.insert("vnp_Command", COMMAND_PAY.to_string());
        params.insert("vnp_TmnCode", self.config.tmn_code.clone());
        params.insert("vnp_Amount", minor_units.to_string());
        params.insert("vnp_CurrCode", "VND".to_string());
        params.insert("vnp_TxnRef", txn_ref.clone());
        params.insert("vnp_OrderInfo", format!("Thanh toan don hang:{txn_ref}"));
        params.insert("vnp_OrderType", ORDER_TYPE.to_string());
        params.insert("vnp_Locale", "vn".to_string());
        params.insert("vnp_ReturnUrl", format!("{}{RETURN_PATH}", self.backend_url));
        params.insert("vnp_IpAddr", client_ip.to_string());
        params.insert("vnp_CreateDate", created);
        params.insert("vnp_ExpireDate", expires);

        let (query, hash_data) = signing_parts(&params);
        let hash = self.sign(&hash_data)?;
        tracing::info!(%txn_ref, amount, "Created VNPay payment");
        Ok(PaymentResponse {
            status: "OK".to_string(),
            message: "Successfully created payment".to_string(),
            url: format!("{}?{query}&vnp_SecureHash={hash}", self.config.pay_url),
        })
    }

    /// Frontend URL the customer lands on after paying.
    pub fn return_redirect(&self, params: &BTreeMap<String, String>) -> String {
        let fail = format!("{}/order-status?status=fail", self.frontend_url);
        if params.contains_key("vnp_SecureHash") && !self.verify_return(params) {
            tracing::warn!("VNPay return with invalid signature");
            return fail;
        }
        if params.get("vnp_ResponseCode").map(String::as_str) != Some("00") {
            return fail;
        }
        let get = |k: &str| params.get(k).map(String::as_str).unwrap_or_default();
        format!(
            "{}/order-status?status=success&txnRef={}&transactionNo={}&amount={}&payDate={}",
            self.frontend_url,
            get("vnp_TxnRef"),
            get("vnp_TransactionNo"),
            get("vnp_Amount"),
            get("vnp_PayDate"),
        )
    }

    /// Recomputes the signature over every `vnp_*` field except the hash itself.
    pub fn verify_return(&self, params: &BTreeMap<String, String>) -> bool {
        let Some(provided) = params.get("vnp_SecureHash") else { return false };
        let fields: BTreeMap<&str, String> = params
            .iter()
            .filter(|(k, _)| k.starts_with("vnp_") && *k != "vnp_SecureHash" && *k != "vnp_SecureHashType")
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        let (_, hash_data) = signing_parts(&fields);
        self.sign(&hash_data).is_ok_and(|computed| computed.eq_ignore_ascii_case(provided))
    }

    pub fn refund_request(
        &self,
        txn_ref: &str,
        amount: i64,
        transaction_no: &str,
        transaction_date: DateTime<Utc>,
        client_ip: &str,
        now: DateTime<Utc>,
    ) -> Result<RefundRequest, AppError> {
        let request_id = random_digits(8);
        let create_date = vn_time(now)?;
        let transaction_date = vn_time(transaction_date)?;
        let order_info = format!("Hoan tien GD OrderId:{txn_ref}");
        let create_by = "admin".to_string();
        let amount = amount.to_string();
        let fields: [&str; 13] = [
            &request_id, VERSION, COMMAND_REFUND, &self.config.tmn_code, TRANSACTION_TYPE_FULL_REFUND,
            txn_ref, &amount, transaction_no, &transaction_date, &create_by, &create_date, client_ip, &order_info,
        ];
        let hash_data = fields.join("|");
        Ok(RefundRequest {
            vnp_SecureHash: self.sign(&hash_data)?,
            vnp_RequestId: request_id,
            vnp_Version: VERSION.to_string(),
            vnp_Command: COMMAND_REFUND.to_string(),
            vnp_TmnCode: self.config.tmn_code.clone(),
            vnp_TransactionType: TRANSACTION_TYPE_FULL_REFUND.to_string(),
            vnp_TxnRef: txn_ref.to_string(),
            vnp_Amount: amount,
            vnp_OrderInfo: order_info,
            vnp_TransactionNo: transaction_no.to_string(),
            vnp_TransactionDate: transaction_date,
            vnp_CreateBy: create_by,
            vnp_CreateDate: create_date,
            vnp_IpAddr: client_ip.to_string(),
        })
    }

    /// Posts a refund; the outcome carries VNPay's response code.
    pub async fn send_refund(&self, request: &RefundRequest) -> Result<RefundOutcome, AppError> {
        let reply: RefundReply = self
            .http
            .post(&self.config.api_url)
            .json(request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::error!(error = %e, "VNPay refund call failed");
                AppError::system("Error when calling VNPay")
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Unreadable VNPay refund reply");
                AppError::system("Error when calling VNPay")
            })?;
        Ok(RefundOutcome { response_code: reply.response_code.unwrap_or_default(), txn_ref: request.vnp_TxnRef.clone() })
    }

    fn sign(&self, data: &str) -> Result<String, AppError> {
        hmac_sha512(self.config.hash_secret.expose_secret(), data)
    }
}

/// Lowercase hex HMAC-SHA512 of `data`.
pub fn hmac_sha512(key: &str, data: &str) -> Result<String, AppError> {
    let mut mac = HmacSha512::new_from_slice(key.as_bytes())
        .map_err(|_| AppError::Internal("Error in generating secure hash".to_string()))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Returns `(query, hash_data)` for the non-empty parameters in key order.
pub fn signing_parts<K: AsRef<str>>(params: &BTreeMap<K, String>) -> (String, String) {
    let mut query = Vec::with_capacity(params.len());
    let mut hash_data = Vec::with_capacity(params.len());
    for (k, v) in params.iter().filter(|(_, v)| !v.is_empty()) {
        let value = form_encode(v);
        hash_data.push(format!("{}={value}", k.as_ref()));
        query.push(format!("{}={value}", form_encode(k.as_ref())));
    }
    (query.join("&"), hash_data.join("&"))
}

fn form_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// `yyyyMMddHHmmss` in Asia/Ho_Chi_Minh.
pub fn vn_time(at: DateTime<Utc>) -> Result<String, AppError> {
    let tz = FixedOffset::east_opt(VN_OFFSET_SECS).ok_or_else(|| AppError::Internal("invalid VN offset".to_string()))?;
    Ok(at.with_timezone(&tz).format("%Y%m%d%H%M%S").to_string())
}

pub fn random_digits(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len).map(|_| char::from(b'0' + rng.gen_range(0..10u8))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use secrecy::SecretString;

    fn gateway() -> VnPay {
        VnPay::new(
            VnPayConfig {
                tmn_code: "TESTCODE".into(),
                hash_secret: SecretString::from("SECRETKEY"),
                pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
                api_url: "http://127.0.0.1:9/api".into(),
            },
            "http://backend.local/",
            "http://frontend.com",
        )
    }

    fn query_map(url: &str) -> BTreeMap<String, String> {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
        url::form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }

    #[test]
    fn hmac_matches_known_vector() {
        // RFC 4231 test case 2
        let mac = hmac_sha512("Jefe", "what do ya want for nothing?").unwrap();
        assert_eq!(
            mac,
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea2505549758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn signing_parts_sorts_encodes_and_skips_empty() {
        let mut params = BTreeMap::new();
        params.insert("vnp_OrderInfo", "Thanh toan:1".to_string());
        params.insert("vnp_Amount", "100000".to_string());
        params.insert("vnp_BankCode", String::new());
        let (query, hash) = signing_parts(&params);
        assert_eq!(hash, "vnp_Amount=100000&vnp_OrderInfo=Thanh+toan%3A1");
        assert_eq!(query, hash);
    }

    #[test]
    fn payment_url_is_signed() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 17, 30, 0).unwrap();
        let resp = gateway().create_payment(1000, "127.0.0.1", now).unwrap();
        assert_eq!(resp.status, "OK");
        assert_eq!(resp.message, "Successfully created payment");

        let params = query_map(&resp.url);
        assert_eq!(params["vnp_Amount"], "100000");
        assert_eq!(params["vnp_Version"], "2.1.0");
        assert_eq!(params["vnp_CreateDate"], "20240302003000");
        assert_eq!(params["vnp_ExpireDate"], "20240302004500");
        assert_eq!(params["vnp_ReturnUrl"], "http://backend.local/api/v1/payment/vnpay-return");
        assert_eq!(params["vnp_TxnRef"].len(), 8);
        assert!(gateway().verify_return(&params));
    }

    #[test]
    fn zero_amount_rejected() {
        let err = gateway().create_payment(0, "127.0.0.1", Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "amount must be greater than 0");
    }

    #[test]
    fn oversized_amount_rejected() {
        let err = gateway().create_payment(i64::MAX / 10, "127.0.0.1", Utc::now()).unwrap_err();
        assert_eq!(err.code(), crate::message::codes::FIELD_NOT_VALID);
        assert_eq!(err.to_string(), "amount is too large");
    }

    #[test]
    fn return_redirects() {
        let mut params: BTreeMap<String, String> = [
            ("vnp_ResponseCode", "00"), ("vnp_TxnRef", "12345678"), ("vnp_TransactionNo", "TXN123"),
            ("vnp_Amount", "100000"), ("vnp_PayDate", "20230405123000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(
            gateway().return_redirect(&params),
            "http://frontend.com/order-status?status=success&txnRef=12345678&transactionNo=TXN123&amount=100000&payDate=20230405123000"
        );

        params.insert("vnp_SecureHash".into(), "deadbeef".into());
        assert_eq!(gateway().return_redirect(&params), "http://frontend.com/order-status?status=fail");

        params.remove("vnp_SecureHash");
        params.insert("vnp_ResponseCode".into(), "01".into());
        assert_eq!(gateway().return_redirect(&params), "http://frontend.com/order-status?status=fail");
    }

    #[test]
    fn refund_hash_covers_pipe_joined_fields() {
        let paid = Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 3, 0, 0).unwrap();
        let req = gateway().refund_request("87654321", 100_000, "TXN1", paid, "10.0.0.1", now).unwrap();
        assert_eq!(req.vnp_Command, "refund");
        assert_eq!(req.vnp_TransactionType, "02");
        assert_eq!(req.vnp_TransactionDate, "20240301100000");
        let data = [
            req.vnp_RequestId.as_str(), "2.1.0", "refund", "TESTCODE", "02", "87654321", "100000", "TXN1",
            "20240301100000", "admin", "20240302100000", "10.0.0.1", req.vnp_OrderInfo.as_str(),
        ]
        .join("|");
        assert_eq!(req.vnp_SecureHash, hmac_sha512("SECRETKEY", &data).unwrap());
    }

    #[test]
    fn random_digits_are_digits() {
        let r = random_digits(8);
        assert_eq!(r.len(), 8);
        assert!(r.chars().all(|c| c.is_ascii_digit()));
    }
}
