//! Coupon lookup.

use super::RecordStore;
use crate::coupon::CouponRecord;
use crate::error::{RecordStoreError, Result};
use crate::records::{CouponDocument, paths};
use std::sync::Arc;

/// Finds coupons by normalized (trimmed, upper-case) code.
pub trait CouponLookup: Send + Sync {
    /// Coupon for `code`, `None` when there is no such coupon.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a malformed coupon document.
    fn find(
        &self,
        code: &str,
    ) -> impl std::future::Future<Output = Result<Option<CouponRecord>>> + Send;
}

/// Reads coupons from `coupons/{CODE}` in a [`RecordStore`].
#[derive(Debug)]
pub struct RecordCouponLookup<R> {
    records: Arc<R>,
}

impl<R> RecordCouponLookup<R> {
    /// Look coupons up in `records`
    #[must_use]
    pub const fn new(records: Arc<R>) -> Self {
        Self { records }
    }
}

impl<R> Clone for RecordCouponLookup<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R: RecordStore> CouponLookup for RecordCouponLookup<R> {
    async fn find(&self, code: &str) -> Result<Option<CouponRecord>> {
        let path = paths::coupon(code);
        let value = self.records.read(&path).await?;

        if value.is_null() {
            return Ok(None);
        }

        let document: CouponDocument =
            serde_json::from_value::<CouponDocument>(value).map_err(|e| RecordStoreError::Decode {
                path,
                message: e.to_string(),
            })?;

        document.into_record(code).map(Some)
    }
}
