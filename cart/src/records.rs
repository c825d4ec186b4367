//! Wire format of the realtime record store.
//!
//! Records are camelCase JSON with prices as major-unit decimals. Collections are
//! objects keyed by product id; the realtime database may also hand back arrays
//! when every key is numeric, so both shapes decode.

use crate::coupon::{CouponRecord, DiscountKind};
use crate::error::RecordStoreError;
use crate::types::{CartLine, Money, Product, ProductId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Record paths
pub mod paths {
    use crate::types::{ProductId, UserId};

    /// `customers/{uid}/cart/products`
    #[must_use]
    pub fn cart(user: &UserId) -> String {
        format!("customers/{user}/cart/products")
    }

    /// `customers/{uid}/cart/products/{product_id}`
    #[must_use]
    pub fn cart_line(user: &UserId, product_id: &ProductId) -> String {
        format!("customers/{user}/cart/products/{product_id}")
    }

    /// `customers/{uid}/wishlist/products`
    #[must_use]
    pub fn wishlist(user: &UserId) -> String {
        format!("customers/{user}/wishlist/products")
    }

    /// `customers/{uid}/wishlist/products/{product_id}`
    #[must_use]
    pub fn wishlist_entry(user: &UserId, product_id: &ProductId) -> String {
        format!("customers/{user}/wishlist/products/{product_id}")
    }

    /// `coupons/{CODE}`
    #[must_use]
    pub fn coupon(code: &str) -> String {
        format!("coupons/{code}")
    }
}

/// Product record under a cart or wishlist path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Product id
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// List price, major units
    pub price: f64,
    /// Sale price, major units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<f64>,
    /// Quantity (cart only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail: String,
    /// Selected size (cart only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    /// Selected color (cart only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,
    /// URL slug
    #[serde(default)]
    pub slug: String,
}

impl ProductRecord {
    /// Record for a cart line
    #[must_use]
    pub fn from_line(line: &CartLine) -> Self {
        Self {
            id: line.product_id.as_str().to_string(),
            name: line.name.clone(),
            price: line.list_price.to_major(),
            sale_price: line.sale_price.map(Money::to_major),
            quantity: Some(line.quantity),
            thumbnail: line.thumbnail.clone(),
            selected_size: Some(line.selected_size.clone()),
            selected_color: Some(line.selected_color.clone()),
            slug: line.slug.clone(),
        }
    }

    /// Record for a wishlist entry
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            id: product.id.as_str().to_string(),
            name: product.name.clone(),
            price: product.list_price.to_major(),
            sale_price: product.sale_price.map(Money::to_major),
            quantity: None,
            thumbnail: product.thumbnail.clone(),
            selected_size: None,
            selected_color: None,
            slug: product.slug.clone(),
        }
    }

    /// JSON value to write
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn prices(&self) -> Result<(Money, Option<Money>), String> {
        let list = Money::from_major(self.price).ok_or_else(|| format!("invalid price {}", self.price))?;
        let sale = match self.sale_price {
            Some(sale) => Some(Money::from_major(sale).ok_or_else(|| format!("invalid sale price {sale}"))?),
            None => None,
        };
        Ok((list, sale))
    }

    /// Decode as a product
    ///
    /// # Errors
    ///
    /// Returns a message when a price is negative or not a number.
    pub fn into_product(self) -> std::result::Result<Product, String> {
        let (list_price, sale_price) = self.prices()?;
        Ok(Product {
            id: ProductId::new(self.id),
            name: self.name,
            list_price,
            sale_price,
            thumbnail: self.thumbnail,
            slug: self.slug,
        })
    }

    /// Decode as a cart line
    ///
    /// # Errors
    ///
    /// Returns a message when a price is invalid or the quantity is zero.
    pub fn into_line(self) -> std::result::Result<CartLine, String> {
        let quantity = self.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err("quantity is zero".to_string());
        }
        let selected_size = self.selected_size.clone().unwrap_or_default();
        let selected_color = self.selected_color.clone().unwrap_or_default();
        let product = self.into_product()?;

        Ok(CartLine {
            quantity,
            selected_size,
            selected_color,
            ..CartLine::from_product(&product)
        })
    }
}

/// Fields written when a line's quantity or variant changes
#[must_use]
pub fn line_patch(line: &CartLine) -> Value {
    json!({
        "quantity": line.quantity,
        "selectedSize": line.selected_size,
        "selectedColor": line.selected_color,
    })
}

fn entries(value: &Value) -> Vec<&Value> {
    match value {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().filter(|item| !item.is_null()).collect(),
        _ => Vec::new(),
    }
}

fn decode_each<T>(
    path: &str,
    value: &Value,
    decode: impl Fn(ProductRecord) -> std::result::Result<T, String>,
) -> Vec<T> {
    entries(value)
        .into_iter()
        .filter_map(|entry| {
            let decoded = serde_json::from_value::<ProductRecord>(entry.clone())
                .map_err(|e| e.to_string())
                .and_then(&decode);
            match decoded {
                Ok(item) => Some(item),
                Err(error) => {
                    tracing::warn!(path, %error, "Skipping malformed record");
                    None
                },
            }
        })
        .collect()
}

/// Decode a cart collection, skipping malformed entries
#[must_use]
pub fn decode_cart(user: &UserId, value: &Value) -> Vec<CartLine> {
    decode_each(&paths::cart(user), value, ProductRecord::into_line)
}

/// Decode a wishlist collection, skipping malformed entries
#[must_use]
pub fn decode_wishlist(user: &UserId, value: &Value) -> Vec<Product> {
    decode_each(&paths::wishlist(user), value, ProductRecord::into_product)
}

/// Coupon document under `coupons/{CODE}`
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponDocument {
    /// Code; the path key is used when absent
    #[serde(default)]
    pub code: Option<String>,
    /// `percentage` or `flat`
    pub discount_type: CouponDiscountType,
    /// Percent (0-100) or major-unit amount
    pub discount_value: f64,
    /// Major-unit minimum subtotal
    #[serde(default)]
    pub min_subtotal: Option<f64>,
    /// RFC 3339 expiry
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Discount type on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponDiscountType {
    /// Percent of subtotal
    Percentage,
    /// Fixed amount
    Flat,
}

impl CouponDocument {
    /// Convert to a coupon record stored under `code`
    ///
    /// # Errors
    ///
    /// Returns [`RecordStoreError::Decode`] for negative or out-of-range values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked
    pub fn into_record(self, code: &str) -> Result<CouponRecord, RecordStoreError> {
        let path = paths::coupon(code);
        let decode_error = |message: String| RecordStoreError::Decode {
            path: path.clone(),
            message,
        };

        let discount = match self.discount_type {
            CouponDiscountType::Percentage => {
                if !(0.0..=100.0).contains(&self.discount_value) {
                    return Err(decode_error(format!(
                        "percentage out of range: {}",
                        self.discount_value
                    )));
                }
                DiscountKind::Percentage {
                    basis_points: (self.discount_value * 100.0).round() as u32,
                }
            },
            CouponDiscountType::Flat => DiscountKind::Flat(
                Money::from_major(self.discount_value)
                    .ok_or_else(|| decode_error(format!("invalid amount: {}", self.discount_value)))?,
            ),
        };

        let min_subtotal = match self.min_subtotal {
            Some(min) => Some(
                Money::from_major(min)
                    .ok_or_else(|| decode_error(format!("invalid minimum: {min}")))?,
            ),
            None => None,
        };

        Ok(CouponRecord {
            code: self.code.map_or_else(|| code.to_string(), |c| c.trim().to_uppercase()),
            discount,
            min_subtotal,
            expires_at: self.expires_at,
        })
    }
}
