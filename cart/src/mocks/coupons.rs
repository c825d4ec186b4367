//! Fixed coupon table.

use crate::coupon::CouponRecord;
use crate::error::{RecordStoreError, Result};
use crate::providers::CouponLookup;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Coupon lookup over a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticCoupons {
    coupons: Arc<Mutex<HashMap<String, CouponRecord>>>,
    failure: Arc<Mutex<Option<String>>>,
    lookups: Arc<AtomicUsize>,
}

impl StaticCoupons {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a coupon under its code
    #[must_use]
    pub fn with(self, coupon: CouponRecord) -> Self {
        self.insert(coupon);
        self
    }

    /// Add a coupon under its code
    pub fn insert(&self, coupon: CouponRecord) {
        self.coupons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(coupon.code.clone(), coupon);
    }

    /// Make lookups fail with `message`; `None` restores service
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = message.map(str::to_string);
    }

    /// Lookups received
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl CouponLookup for StaticCoupons {
    fn find(&self, code: &str) -> impl Future<Output = Result<Option<CouponRecord>>> + Send {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let coupon = self
            .coupons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned();

        async move {
            match failure {
                Some(message) => Err(RecordStoreError::Unavailable(message)),
                None => Ok(coupon),
            }
        }
    }
}
