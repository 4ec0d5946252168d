//! Domain model for booking workflows.
//!
//! The wire shape is fixed for compatibility with any store
//! implementation: a workflow serializes as
//! `{id, customerName, steps: [...], finished}` and each step carries
//! its metadata as a flat JSON object. In memory, step metadata is a
//! tagged variant over the step category with typed optional fields,
//! falling back to a generic string-keyed map for unrecognized
//! categories or malformed payloads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use super::category::{classify, StepCategory};

/// Flat JSON object, the wire representation of step metadata.
pub type JsonMap = serde_json::Map<String, Value>;

/// Status of a single booking step.
///
/// Serialized as the literal tokens `PENDING`, `IN_PROGRESS`,
/// `COMPLETED`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

/// Flight booking details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cabin_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Keys the typed form does not know about, preserved verbatim.
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Hotel accommodation details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Visa / immigration details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Activity / excursion details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Step metadata, typed by the step's category.
///
/// The category is derived from the step name, never from the payload
/// itself, so a reorder or rename does not silently re-tag stored data
/// mid-flight: metadata is re-interpreted only when a document crosses
/// the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum StepMetadata {
    Flight(FlightDetails),
    Hotel(HotelDetails),
    Visa(VisaDetails),
    Activity(ActivityDetails),
    Generic(JsonMap),
}

impl Default for StepMetadata {
    fn default() -> Self {
        StepMetadata::Generic(JsonMap::new())
    }
}

impl StepMetadata {
    /// Empty metadata for the given category.
    pub fn empty(category: StepCategory) -> Self {
        match category {
            StepCategory::Flight => StepMetadata::Flight(FlightDetails::default()),
            StepCategory::Hotel => StepMetadata::Hotel(HotelDetails::default()),
            StepCategory::Visa => StepMetadata::Visa(VisaDetails::default()),
            StepCategory::Activity => StepMetadata::Activity(ActivityDetails::default()),
            StepCategory::Generic => StepMetadata::Generic(JsonMap::new()),
        }
    }

    /// Interpret a flat wire object as metadata for the given category.
    ///
    /// A payload that does not fit the typed form (for example a number
    /// where a string is expected) is kept as-is under `Generic` rather
    /// than rejected.
    pub fn from_map(category: StepCategory, map: JsonMap) -> Self {
        fn typed<T, F>(map: JsonMap, wrap: F) -> StepMetadata
        where
            T: serde::de::DeserializeOwned,
            F: FnOnce(T) -> StepMetadata,
        {
            match serde_json::from_value::<T>(Value::Object(map.clone())) {
                Ok(details) => wrap(details),
                Err(_) => StepMetadata::Generic(map),
            }
        }

        match category {
            StepCategory::Flight => typed(map, StepMetadata::Flight),
            StepCategory::Hotel => typed(map, StepMetadata::Hotel),
            StepCategory::Visa => typed(map, StepMetadata::Visa),
            StepCategory::Activity => typed(map, StepMetadata::Activity),
            StepCategory::Generic => StepMetadata::Generic(map),
        }
    }

    /// Flatten back to the wire object.
    pub fn to_map(&self) -> JsonMap {
        let value = match self {
            StepMetadata::Flight(d) => serde_json::to_value(d),
            StepMetadata::Hotel(d) => serde_json::to_value(d),
            StepMetadata::Visa(d) => serde_json::to_value(d),
            StepMetadata::Activity(d) => serde_json::to_value(d),
            StepMetadata::Generic(map) => return map.clone(),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => JsonMap::new(),
        }
    }

    /// Category this metadata is typed as.
    pub fn category(&self) -> StepCategory {
        match self {
            StepMetadata::Flight(_) => StepCategory::Flight,
            StepMetadata::Hotel(_) => StepCategory::Hotel,
            StepMetadata::Visa(_) => StepCategory::Visa,
            StepMetadata::Activity(_) => StepCategory::Activity,
            StepMetadata::Generic(_) => StepCategory::Generic,
        }
    }

    /// True when no fields are set.
    pub fn is_empty(&self) -> bool {
        self.to_map().is_empty()
    }
}

/// A single booking task within a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Unique within the owning workflow, stable across reordering.
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: StepStatus,
    pub metadata: StepMetadata,
    /// Travel advisory warning, set by the annotator only.
    pub warning: Option<String>,
    /// Suggested alternative for an advisory violation.
    pub alternative: Option<String>,
}

impl Step {
    /// New pending step with a fresh id and empty metadata typed for
    /// its category.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let name = name.into();
        let metadata = StepMetadata::empty(classify(&name));
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            description: description.into(),
            status: StepStatus::Pending,
            metadata,
            warning: None,
            alternative: None,
        }
    }

    /// Category this step's form belongs to, derived from the name.
    pub fn category(&self) -> StepCategory {
        classify(&self.name)
    }
}

/// Wire representation of [`Step`]: metadata as a flat object.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStep {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    status: StepStatus,
    #[serde(default)]
    metadata: JsonMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alternative: Option<String>,
}

impl Serialize for Step {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        RawStep {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            metadata: self.metadata.to_map(),
            warning: self.warning.clone(),
            alternative: self.alternative.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Step {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawStep::deserialize(deserializer)?;
        let metadata = StepMetadata::from_map(classify(&raw.name), raw.metadata);
        Ok(Step {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            status: raw.status,
            metadata,
            warning: raw.warning,
            alternative: raw.alternative,
        })
    }
}

/// One customer's booking: an ordered sequence of steps plus a
/// finished flag.
///
/// Step order is semantically meaningful: it defines the execution
/// sequence, and a completed step may only auto-advance the step
/// immediately following it in the current order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_date: Option<NaiveDate>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Monotonic: once true, the booking is confirmed and never
    /// reopened by this engine.
    #[serde(default)]
    pub finished: bool,
}

impl Workflow {
    /// New unfinished workflow with a fresh id.
    pub fn new(customer_name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            customer_name: customer_name.into(),
            customer_email: None,
            source: None,
            destination: None,
            travel_date: None,
            steps,
            finished: false,
        }
    }

    /// Find a step by id.
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// Number of completed steps.
    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    /// True when every step is completed.
    pub fn all_steps_completed(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Completed)
    }
}
