use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};
use uuid::Uuid;

use super::capacity::CapacityCell;
use super::common::{flexible_date, lenient_date};
use crate::billing;

/// Number of guests sharing one room unit. Stored as its integer value;
/// accepts `2`, `"2"` and `"2 Sharing"` when read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SharingType {
    One = 1,
    Two = 2,
    Three = 3,
}

impl SharingType {
    pub const ALL: [SharingType; 3] = [SharingType::One, SharingType::Two, SharingType::Three];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Lowest bed count a room of this sharing type may be configured with.
    pub fn minimum_beds(self) -> u8 {
        self.value()
    }

    /// Bed count used when no override has been stored for a room.
    pub fn default_beds(self) -> u8 {
        self.value()
    }
}

impl TryFrom<u64> for SharingType {
    type Error = String;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SharingType::One),
            2 => Ok(SharingType::Two),
            3 => Ok(SharingType::Three),
            other => Err(format!("unsupported sharing type `{other}`")),
        }
    }
}

impl FromStr for SharingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        let digits = lowered.strip_suffix("sharing").unwrap_or(&lowered).trim();
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("unsupported sharing type `{}`", s.trim()))?;
        SharingType::try_from(value)
    }
}

impl fmt::Display for SharingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Sharing", self.value())
    }
}

impl Serialize for SharingType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for SharingType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SharingVisitor;

        impl<'de> Visitor<'de> for SharingVisitor {
            type Value = SharingType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sharing type as 1, 2, 3 or \"N Sharing\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<SharingType, E> {
                SharingType::try_from(value).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<SharingType, E> {
                let value = u64::try_from(value).map_err(E::custom)?;
                self.visit_u64(value)
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<SharingType, E> {
                if value.fract() == 0.0 && value >= 0.0 {
                    self.visit_u64(value as u64)
                } else {
                    Err(E::custom(format!("unsupported sharing type `{value}`")))
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<SharingType, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SharingVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentStatus {
    #[default]
    Pending,
    #[serde(rename = "Partial Paid")]
    PartialPaid,
    Paid,
    Breached,
}

impl PaymentStatus {
    /// Pending and partially paid guests still owe part of the cycle.
    pub fn is_outstanding(self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::PartialPaid)
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending",
            PaymentStatus::PartialPaid => "Partial Paid",
            PaymentStatus::Paid => "Paid",
            PaymentStatus::Breached => "Breached",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "partial" | "partialpaid" => Ok(PaymentStatus::PartialPaid),
            "paid" => Ok(PaymentStatus::Paid),
            "breached" => Ok(PaymentStatus::Breached),
            _ => Err(format!("unknown payment status `{}`", s.trim())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VacateFlag {
    #[serde(alias = "yes", alias = "YES")]
    Yes,
    #[default]
    #[serde(alias = "no", alias = "NO")]
    No,
}

impl VacateFlag {
    pub fn is_vacated(self) -> bool {
        matches!(self, VacateFlag::Yes)
    }
}

impl fmt::Display for VacateFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.is_vacated() { "Yes" } else { "No" })
    }
}

impl From<bool> for VacateFlag {
    fn from(vacated: bool) -> Self {
        if vacated {
            VacateFlag::Yes
        } else {
            VacateFlag::No
        }
    }
}

/// A registered resident and their payment cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub mobile: String,
    pub building: String,
    pub room_no: String,
    pub sharing_type: SharingType,
    #[serde(with = "flexible_date")]
    pub joining_date: NaiveDate,
    #[serde(default)]
    pub advance_payment: f64,
    #[serde(default)]
    pub payment_amount: f64,
    #[serde(default, with = "lenient_date")]
    pub monthly_payment_date: Option<NaiveDate>,
    #[serde(default, with = "lenient_date")]
    pub upcoming_payment_due_date: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_payment_status: PaymentStatus,
    #[serde(default)]
    pub room_vacate: VacateFlag,
    #[serde(default)]
    pub remarks: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Guest {
    /// Builds a new guest from a registration form, deriving the first due date.
    pub fn from_draft(draft: GuestDraft) -> Self {
        let now = Utc::now();
        let mut guest = Self {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            mobile: draft.mobile.trim().to_string(),
            building: draft.building.trim().to_string(),
            room_no: draft.room_no.trim().to_string(),
            sharing_type: draft.sharing_type,
            joining_date: draft.joining_date,
            advance_payment: draft.advance_payment,
            payment_amount: draft.payment_amount,
            monthly_payment_date: draft.monthly_payment_date,
            upcoming_payment_due_date: None,
            monthly_payment_status: draft.monthly_payment_status.unwrap_or_default(),
            room_vacate: VacateFlag::No,
            remarks: draft.remarks.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        guest.refresh_due_date();
        guest
    }

    pub fn cell(&self) -> CapacityCell {
        CapacityCell::new(
            self.building.clone(),
            self.room_no.clone(),
            self.sharing_type,
        )
    }

    pub fn is_active(&self) -> bool {
        !self.room_vacate.is_vacated()
    }

    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    /// Recomputes the persisted due date from the joining day and last payment.
    pub fn refresh_due_date(&mut self) {
        self.upcoming_payment_due_date =
            billing::compute_next_due_date(self.joining_date, self.monthly_payment_date);
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Registration form contents.
#[derive(Debug, Clone, PartialEq)]
pub struct GuestDraft {
    pub name: String,
    pub mobile: String,
    pub building: String,
    pub room_no: String,
    pub sharing_type: SharingType,
    pub joining_date: NaiveDate,
    pub advance_payment: f64,
    pub payment_amount: f64,
    pub monthly_payment_date: Option<NaiveDate>,
    pub monthly_payment_status: Option<PaymentStatus>,
    pub remarks: String,
}

impl GuestDraft {
    pub fn new(
        name: impl Into<String>,
        mobile: impl Into<String>,
        cell: CapacityCell,
        joining_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            mobile: mobile.into(),
            building: cell.building,
            room_no: cell.room_no,
            sharing_type: cell.sharing_type,
            joining_date,
            advance_payment: 0.0,
            payment_amount: 0.0,
            monthly_payment_date: None,
            monthly_payment_status: None,
            remarks: String::new(),
        }
    }

    pub fn cell(&self) -> CapacityCell {
        CapacityCell::new(
            self.building.trim(),
            self.room_no.trim(),
            self.sharing_type,
        )
    }
}

/// Partial update applied by the guest store; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPatch {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub building: Option<String>,
    pub room_no: Option<String>,
    pub sharing_type: Option<SharingType>,
    pub joining_date: Option<NaiveDate>,
    pub advance_payment: Option<f64>,
    pub payment_amount: Option<f64>,
    pub monthly_payment_date: Option<NaiveDate>,
    pub upcoming_payment_due_date: Option<NaiveDate>,
    pub monthly_payment_status: Option<PaymentStatus>,
    pub room_vacate: Option<VacateFlag>,
    pub remarks: Option<String>,
}

impl GuestPatch {
    pub fn status(status: PaymentStatus) -> Self {
        Self {
            monthly_payment_status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// True when the patch moves the guest to another bed or back into one.
    pub fn changes_placement(&self, guest: &Guest) -> bool {
        let moved = self
            .building
            .as_deref()
            .is_some_and(|b| b.trim() != guest.building)
            || self
                .room_no
                .as_deref()
                .is_some_and(|r| r.trim() != guest.room_no)
            || self.sharing_type.is_some_and(|s| s != guest.sharing_type);
        let returning = guest.room_vacate.is_vacated() && self.room_vacate == Some(VacateFlag::No);
        moved || returning
    }

    pub fn changes_cycle(&self) -> bool {
        self.joining_date.is_some() || self.monthly_payment_date.is_some()
    }

    /// Copies every present field onto `guest`.
    pub fn apply(&self, guest: &mut Guest) {
        if let Some(name) = &self.name {
            guest.name = name.trim().to_string();
        }
        if let Some(mobile) = &self.mobile {
            guest.mobile = mobile.trim().to_string();
        }
        if let Some(building) = &self.building {
            guest.building = building.trim().to_string();
        }
        if let Some(room_no) = &self.room_no {
            guest.room_no = room_no.trim().to_string();
        }
        if let Some(sharing_type) = self.sharing_type {
            guest.sharing_type = sharing_type;
        }
        if let Some(joining_date) = self.joining_date {
            guest.joining_date = joining_date;
        }
        if let Some(amount) = self.advance_payment {
            guest.advance_payment = amount;
        }
        if let Some(amount) = self.payment_amount {
            guest.payment_amount = amount;
        }
        if let Some(date) = self.monthly_payment_date {
            guest.monthly_payment_date = Some(date);
        }
        if let Some(date) = self.upcoming_payment_due_date {
            guest.upcoming_payment_due_date = Some(date);
        }
        if let Some(status) = self.monthly_payment_status {
            guest.monthly_payment_status = status;
        }
        if let Some(flag) = self.room_vacate {
            guest.room_vacate = flag;
        }
        if let Some(remarks) = &self.remarks {
            guest.remarks = remarks.trim().to_string();
        }
        guest.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sharing_type_reads_numbers_and_labels() {
        let from_number: SharingType = serde_json::from_value(json!(2)).unwrap();
        let from_label: SharingType = serde_json::from_value(json!("2 Sharing")).unwrap();
        let from_digit: SharingType = serde_json::from_value(json!("3")).unwrap();
        assert_eq!(from_number, SharingType::Two);
        assert_eq!(from_label, SharingType::Two);
        assert_eq!(from_digit, SharingType::Three);
        assert!(serde_json::from_value::<SharingType>(json!(4)).is_err());
        assert_eq!(serde_json::to_value(SharingType::Two).unwrap(), json!(2));
    }

    #[test]
    fn guest_reads_original_record_shape() {
        let raw = json!({
            "id": "7f1c3a8e-8d2b-4a53-9d51-0c1bb0f0a111",
            "name": "Asha",
            "mobile": "9000000001",
            "building": "Building-1",
            "roomNo": "G01",
            "sharingType": "2 Sharing",
            "joiningDate": "2024-01-31",
            "advancePayment": 5000,
            "paymentAmount": 7500.5,
            "monthlyPaymentDate": "",
            "upcomingPaymentDueDate": "2024-02-29",
            "monthlyPaymentStatus": "Partial Paid",
            "roomVacate": "No",
            "remarks": ""
        });
        let guest: Guest = serde_json::from_value(raw).expect("guest parses");
        assert_eq!(guest.sharing_type, SharingType::Two);
        assert_eq!(guest.monthly_payment_date, None);
        assert_eq!(guest.upcoming_payment_due_date, Some(date(2024, 2, 29)));
        assert_eq!(guest.monthly_payment_status, PaymentStatus::PartialPaid);
        assert!(guest.is_active());
    }

    #[test]
    fn draft_derives_due_date_and_pending_status() {
        let cell = CapacityCell::new("Building-1", "G01", SharingType::Two);
        let guest = Guest::from_draft(GuestDraft::new("Ravi", "9000", cell, date(2024, 3, 15)));
        assert_eq!(guest.monthly_payment_status, PaymentStatus::Pending);
        assert_eq!(guest.upcoming_payment_due_date, Some(date(2024, 4, 15)));
    }

    #[test]
    fn patch_detects_placement_changes() {
        let cell = CapacityCell::new("Building-1", "G01", SharingType::Two);
        let mut guest = Guest::from_draft(GuestDraft::new("Ravi", "9000", cell, date(2024, 3, 15)));
        let rename = GuestPatch {
            name: Some("Ravi K".into()),
            ..GuestPatch::default()
        };
        assert!(!rename.changes_placement(&guest));

        let same_room = GuestPatch {
            room_no: Some("G01".into()),
            ..GuestPatch::default()
        };
        assert!(!same_room.changes_placement(&guest));

        guest.room_vacate = VacateFlag::Yes;
        let returning = GuestPatch {
            room_vacate: Some(VacateFlag::No),
            ..GuestPatch::default()
        };
        assert!(returning.changes_placement(&guest));
    }

    #[test]
    fn payment_status_parses_loosely() {
        assert_eq!("partial".parse::<PaymentStatus>(), Ok(PaymentStatus::PartialPaid));
        assert_eq!("Partial Paid".parse::<PaymentStatus>(), Ok(PaymentStatus::PartialPaid));
        assert_eq!(" PAID ".parse::<PaymentStatus>(), Ok(PaymentStatus::Paid));
        assert!("late".parse::<PaymentStatus>().is_err());
    }
}
