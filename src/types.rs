use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineError;

// ---------------------------------------------------------------------------
// Niche
// ---------------------------------------------------------------------------

/// Content category keying the behavioral assumptions.
///
/// Parsing is exact and case-sensitive: `"Fitness"` is not `Niche::Fitness`
/// but `Niche::Other("Fitness")`, so registry lookups stay exact-match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Niche {
    Fitness,
    Finance,
    Beauty,
    Gaming,
    Education,
    Food,
    Travel,
    Tech,
    Lifestyle,
    Other(String),
}

impl Niche {
    pub fn as_str(&self) -> &str {
        match self {
            Niche::Fitness => "fitness",
            Niche::Finance => "finance",
            Niche::Beauty => "beauty",
            Niche::Gaming => "gaming",
            Niche::Education => "education",
            Niche::Food => "food",
            Niche::Travel => "travel",
            Niche::Tech => "tech",
            Niche::Lifestyle => "lifestyle",
            Niche::Other(s) => s,
        }
    }
}

impl From<&str> for Niche {
    fn from(s: &str) -> Self {
        match s {
            "fitness" => Niche::Fitness,
            "finance" => Niche::Finance,
            "beauty" => Niche::Beauty,
            "gaming" => Niche::Gaming,
            "education" => Niche::Education,
            "food" => Niche::Food,
            "travel" => Niche::Travel,
            "tech" => Niche::Tech,
            "lifestyle" => Niche::Lifestyle,
            other => Niche::Other(other.to_string()),
        }
    }
}

impl From<String> for Niche {
    fn from(s: String) -> Self {
        Niche::from(s.as_str())
    }
}

impl From<Niche> for String {
    fn from(n: Niche) -> Self {
        match n {
            Niche::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Niche {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Platform / revenue stream
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Youtube,
    Instagram,
    Tiktok,
    Twitter,
    Facebook,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Other(s) => s,
        }
    }
}

impl From<&str> for Platform {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Platform::Youtube,
            "instagram" => Platform::Instagram,
            "tiktok" => Platform::Tiktok,
            "twitter" | "x" => Platform::Twitter,
            "facebook" => Platform::Facebook,
            _ => Platform::Other(s.to_string()),
        }
    }
}

impl From<String> for Platform {
    fn from(s: String) -> Self {
        Platform::from(s.as_str())
    }
}

impl From<Platform> for String {
    fn from(p: Platform) -> Self {
        match p {
            Platform::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How an account monetizes its audience.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RevenueStream {
    Course,
    Affiliate,
    Ad,
    Sponsorship,
    Merchandise,
    Subscription,
    Other(String),
}

impl RevenueStream {
    pub fn as_str(&self) -> &str {
        match self {
            RevenueStream::Course => "Course",
            RevenueStream::Affiliate => "Affiliate",
            RevenueStream::Ad => "Ad",
            RevenueStream::Sponsorship => "Sponsorship",
            RevenueStream::Merchandise => "Merchandise",
            RevenueStream::Subscription => "Subscription",
            RevenueStream::Other(s) => s,
        }
    }
}

impl From<&str> for RevenueStream {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "course" => RevenueStream::Course,
            "affiliate" => RevenueStream::Affiliate,
            "ad" | "ads" => RevenueStream::Ad,
            "sponsorship" => RevenueStream::Sponsorship,
            "merchandise" | "merch" => RevenueStream::Merchandise,
            "subscription" => RevenueStream::Subscription,
            _ => RevenueStream::Other(s.to_string()),
        }
    }
}

impl From<String> for RevenueStream {
    fn from(s: String) -> Self {
        RevenueStream::from(s.as_str())
    }
}

impl From<RevenueStream> for String {
    fn from(r: RevenueStream) -> Self {
        match r {
            RevenueStream::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for RevenueStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Idr,
    Usd,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Idr => "IDR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Idr => "Rp",
            Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }

    pub fn group_separator(&self) -> char {
        match self {
            Currency::Idr | Currency::Eur => '.',
            Currency::Usd => ',',
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IDR" => Ok(Currency::Idr),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(EngineError::invalid("currency", format!("unsupported currency code {other:?}"))),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// An amount tagged with its currency. Stays numeric until the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn zero(currency: Currency) -> Self {
        Self { amount: 0.0, currency }
    }
}

// ---------------------------------------------------------------------------
// Entries and assumptions
// ---------------------------------------------------------------------------

/// Largest audience the funnel counts exactly: every integer up to 2^53 - 1
/// survives the trip through `f64`.
pub const MAX_AUDIENCE: u64 = 9_007_199_254_740_991;

/// Rejects audiences the funnel cannot count without rounding.
pub fn check_audience(audience: i64) -> Result<u64, EngineError> {
    let audience = u64::try_from(audience)
        .map_err(|_| EngineError::invalid("audience", format!("must be >= 0, got {audience}")))?;
    if audience > MAX_AUDIENCE {
        return Err(EngineError::invalid(
            "audience",
            format!("must be <= {MAX_AUDIENCE}, got {audience}"),
        ));
    }
    Ok(audience)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetSpotEntry {
    pub id: String,
    pub account: String,
    pub niche: Niche,
    pub audience: u64,
    pub platform: Platform,
    pub revenue_stream: RevenueStream,
    pub pricing: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Submitted fields for a new or edited entry, before validation.
///
/// `audience` and `pricing` are signed here so a negative submission is
/// reported as an invalid field rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFields {
    pub account: String,
    pub niche: Niche,
    pub audience: i64,
    pub platform: Platform,
    pub revenue_stream: RevenueStream,
    pub pricing: f64,
    /// Falls back to the configured default currency when absent.
    #[serde(default)]
    pub currency: Option<Currency>,
}

impl EntryFields {
    /// Checks the entry invariants and returns `(audience, pricing)` in their
    /// stored form.
    pub fn validate(&self, default_currency: Currency) -> Result<(u64, Money), EngineError> {
        if self.account.trim().is_empty() {
            return Err(EngineError::invalid("account", "must not be empty"));
        }
        if self.niche.as_str().trim().is_empty() {
            return Err(EngineError::invalid("niche", "must not be empty"));
        }
        let audience = check_audience(self.audience)?;
        if !self.pricing.is_finite() || self.pricing < 0.0 {
            return Err(EngineError::invalid(
                "pricing",
                format!("must be a finite amount >= 0, got {}", self.pricing),
            ));
        }
        let currency = self.currency.unwrap_or(default_currency);
        Ok((audience, Money::new(self.pricing, currency)))
    }

    /// Builds an unsaved entry, used for previews that never touch the store.
    pub fn into_draft(self, default_currency: Currency) -> Result<SweetSpotEntry, EngineError> {
        let (audience, pricing) = self.validate(default_currency)?;
        Ok(SweetSpotEntry {
            id: "draft".to_string(),
            account: self.account,
            niche: self.niche,
            audience,
            platform: self.platform,
            revenue_stream: self.revenue_stream,
            pricing,
            created_at: None,
            updated_at: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetSpotAssumption {
    pub niche: Niche,
    pub engagement_rate: f64,
    pub conversion_rate: f64,
    pub buyer_rate: f64,
}

impl SweetSpotAssumption {
    /// Checks every rate is finite and within [0, 1], naming the first bad one.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (field, rate) in [
            ("engagementRate", self.engagement_rate),
            ("conversionRate", self.conversion_rate),
            ("buyerRate", self.buyer_rate),
        ] {
            if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
                return Err(EngineError::invalid(field, format!("must be within [0, 1], got {rate}")));
            }
        }
        Ok(())
    }

    /// The same rates keyed to another niche. Used when a caller supplies a
    /// fallback assumption for an unregistered niche.
    pub fn rekeyed(&self, niche: Niche) -> Self {
        Self { niche, ..self.clone() }
    }
}

// ---------------------------------------------------------------------------
// Derived records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetSpotResult {
    pub niche: Niche,
    pub engaged_audience: u64,
    pub interested_audience: u64,
    pub buyers: u64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetSpotAnalysis {
    pub grand_total: f64,
    pub currency: Currency,
    pub conversion: f64,
    pub sales_per_month: u64,
    pub revenue_per_month: String,
    pub product_price: String,
}

/// One row of the sweet-spot leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweetSpotRanking {
    pub entry_id: String,
    pub account: String,
    pub niche: Niche,
    pub platform: Platform,
    pub revenue_stream: RevenueStream,
    pub revenue_per_follower: f64,
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NicheAnalysis {
    pub niche: Niche,
    pub entries: usize,
    pub analysis: SweetSpotAnalysis,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
