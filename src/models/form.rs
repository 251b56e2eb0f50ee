use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{Category, ProductFields};

pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 255;
pub const STOCK_MAX: i64 = 999_999;
pub const DESCRIPTION_MAX: usize = 1000;
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpeg", "png", "jpg", "gif"];

fn price_max() -> Decimal {
    Decimal::new(99_999_999_999, 2)
}

/// Field name to messages, in the shape returned with a 422.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: FormField, message: impl Into<String>) {
        self.0
            .entry(field.as_str().to_string())
            .or_default()
            .push(message.into());
    }

    pub fn has(&self, field: FormField) -> bool {
        self.0.contains_key(field.as_str())
    }

    pub fn get(&self, field: FormField) -> &[String] {
        self.0
            .get(field.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn only(mut self, field: FormField) -> Self {
        self.0.retain(|key, _| key == field.as_str());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Name,
    Price,
    Stock,
    CategoryId,
    Description,
    Image,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Name => "name",
            FormField::Price => "price",
            FormField::Stock => "stock",
            FormField::CategoryId => "category_id",
            FormField::Description => "description",
            FormField::Image => "image",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            FormField::CategoryId => "category id",
            other => other.as_str(),
        }
    }

    pub fn required_message(&self) -> String {
        format!("The {} field is required.", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
}

impl ImageKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "jpg",
            ImageKind::Png => "png",
            ImageKind::Gif => "gif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
        }
    }
}

/// A file received with the product form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Sniffs the leading bytes; the declared content type is not trusted.
    pub fn kind(&self) -> Option<ImageKind> {
        let bytes = self.bytes.as_slice();
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageKind::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageKind::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageKind::Gif)
        } else {
            None
        }
    }

    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    pub fn size_kb(&self) -> usize {
        self.bytes.len().div_ceil(1024)
    }
}

/// Raw values as typed into the product form. Numbers may arrive as JSON
/// numbers or strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductInput {
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub stock: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub description: Option<String>,
    #[serde(skip)]
    pub image: Option<ImageUpload>,
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Blank strings count as missing, like an empty form input.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Per-field results of the rules that need no store access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckedInput {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<i32>,
    pub description: Option<String>,
}

impl CheckedInput {
    /// Only meaningful once the error bag is known to be empty.
    pub fn into_fields(self, image_path: Option<String>) -> Option<ProductFields> {
        Some(ProductFields {
            name: self.name?,
            price: self.price?,
            stock: self.stock?,
            category_id: self.category_id?,
            description: self.description,
            image_path,
        })
    }
}

impl ProductInput {
    pub fn check(&self, max_image_kb: usize, errors: &mut ValidationErrors) -> CheckedInput {
        let checked = CheckedInput {
            name: self.check_name(errors),
            price: self.check_price(errors),
            stock: self.check_stock(errors),
            category_id: self.check_category_id(errors),
            description: self.check_description(errors),
        };
        self.check_image(max_image_kb, errors);
        checked
    }

    pub fn check_field(&self, field: FormField, max_image_kb: usize, errors: &mut ValidationErrors) {
        match field {
            FormField::Name => {
                self.check_name(errors);
            }
            FormField::Price => {
                self.check_price(errors);
            }
            FormField::Stock => {
                self.check_stock(errors);
            }
            FormField::CategoryId => {
                self.check_category_id(errors);
            }
            FormField::Description => {
                self.check_description(errors);
            }
            FormField::Image => self.check_image(max_image_kb, errors),
        }
    }

    fn check_name(&self, errors: &mut ValidationErrors) -> Option<String> {
        let Some(name) = present(&self.name) else {
            errors.add(FormField::Name, FormField::Name.required_message());
            return None;
        };

        let length = name.chars().count();
        if length < NAME_MIN {
            errors.add(
                FormField::Name,
                format!("The name field must be at least {} characters.", NAME_MIN),
            );
            return None;
        }
        if length > NAME_MAX {
            errors.add(
                FormField::Name,
                format!(
                    "The name field must not be greater than {} characters.",
                    NAME_MAX
                ),
            );
            return None;
        }

        Some(name.to_string())
    }

    fn check_price(&self, errors: &mut ValidationErrors) -> Option<Decimal> {
        let Some(raw) = present(&self.price) else {
            errors.add(FormField::Price, FormField::Price.required_message());
            return None;
        };

        let Ok(price) = Decimal::from_str(raw) else {
            errors.add(FormField::Price, "The price field must be a number.");
            return None;
        };

        if price.is_sign_negative() && !price.is_zero() {
            errors.add(FormField::Price, "The price field must be at least 0.");
            return None;
        }
        if price > price_max() {
            errors.add(
                FormField::Price,
                "The price field must not be greater than 999999999.99.",
            );
            return None;
        }

        Some(price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    fn check_stock(&self, errors: &mut ValidationErrors) -> Option<i32> {
        let Some(raw) = present(&self.stock) else {
            errors.add(FormField::Stock, FormField::Stock.required_message());
            return None;
        };

        let Ok(stock) = raw.parse::<i64>() else {
            errors.add(FormField::Stock, "The stock field must be an integer.");
            return None;
        };

        if stock < 0 {
            errors.add(FormField::Stock, "The stock field must be at least 0.");
            return None;
        }
        if stock > STOCK_MAX {
            errors.add(
                FormField::Stock,
                format!("The stock field must not be greater than {}.", STOCK_MAX),
            );
            return None;
        }

        i32::try_from(stock).ok()
    }

    fn check_category_id(&self, errors: &mut ValidationErrors) -> Option<i32> {
        let Some(raw) = present(&self.category_id) else {
            errors.add(
                FormField::CategoryId,
                FormField::CategoryId.required_message(),
            );
            return None;
        };

        match raw.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(FormField::CategoryId, invalid_category_message());
                None
            }
        }
    }

    fn check_description(&self, errors: &mut ValidationErrors) -> Option<String> {
        let description = present(&self.description)?;

        if description.chars().count() > DESCRIPTION_MAX {
            errors.add(
                FormField::Description,
                format!(
                    "The description field must not be greater than {} characters.",
                    DESCRIPTION_MAX
                ),
            );
            return None;
        }

        Some(description.to_string())
    }

    fn check_image(&self, max_image_kb: usize, errors: &mut ValidationErrors) {
        let Some(image) = &self.image else {
            return;
        };

        if image.kind().is_none() {
            errors.add(FormField::Image, "The image field must be an image.");
        }

        let extension_allowed = image
            .extension()
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
        if !extension_allowed {
            errors.add(
                FormField::Image,
                format!(
                    "The image field must be a file of type: {}.",
                    IMAGE_EXTENSIONS.join(", ")
                ),
            );
        }

        if image.size_kb() > max_image_kb {
            errors.add(
                FormField::Image,
                format!(
                    "The image field must not be greater than {} kilobytes.",
                    max_image_kb
                ),
            );
        }
    }
}

pub fn invalid_category_message() -> &'static str {
    "The selected category id is invalid."
}

pub fn name_taken_message() -> &'static str {
    "The name has already been taken."
}

#[derive(Debug, Deserialize)]
pub struct ValidateFieldRequest {
    pub field: FormField,
    #[serde(default)]
    pub product_id: Option<i32>,
    #[serde(flatten)]
    pub input: ProductInput,
}

#[derive(Debug, Serialize)]
pub struct ValidateFieldResponse {
    pub field: FormField,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Create,
    Edit,
}

/// What the form needs to render for create or edit.
#[derive(Debug, Serialize)]
pub struct ProductFormView {
    pub mode: FormMode,
    pub product_id: Option<i32>,
    pub name: Option<String>,
    pub price: Option<String>,
    pub stock: Option<String>,
    pub category_id: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub categories: Vec<Category>,
}
