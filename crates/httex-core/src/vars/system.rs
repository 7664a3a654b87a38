//! System function evaluation (`$guid`, `$randomInt`, `$datetime`, ...) and
//! the per-request memoization scope that keeps repeated occurrences of the
//! same placeholder stable within one request.

use std::cell::RefCell;
use std::collections::HashMap;

use chrono::{DateTime, Local, TimeZone, Utc};
use rand::Rng;
use uuid::Uuid;

use crate::sources::EnvGetter;

const FIRST_NAMES: &[&str] = &["James", "Mary", "Robert", "Patricia", "John", "Linda", "Michael", "Elizabeth"];
const LAST_NAMES: &[&str] = &["Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis"];
const JOB_TITLES: &[&str] = &["Software Engineer", "Product Manager", "Data Analyst", "Designer", "DevOps Engineer"];
const CITIES: &[&str] = &["Springfield", "Riverside", "Franklin", "Greenville", "Fairview", "Madison"];
const STATES: &[&str] = &["California", "Texas", "New York", "Florida", "Ohio", "Washington"];
const COUNTRIES: &[&str] = &["United States", "Canada", "Germany", "Japan", "Brazil", "Australia"];
const STREETS: &[&str] = &["Main St", "Oak Ave", "Maple Dr", "Cedar Ln", "Elm St", "Pine Rd"];
const DOMAINS: &[&str] = &["example.com", "example.org", "example.net", "test.dev"];
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
];

/// Owns the memoization map for one request materialization. Fresh between
/// requests, guaranteeing cross-request variability while keeping repeated
/// occurrences within a request stable.
#[derive(Debug, Default)]
pub struct RequestScope {
    cache: RefCell<HashMap<String, String>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_generate(&self, raw_key: &str, generate: impl FnOnce() -> String) -> String {
        if let Some(existing) = self.cache.borrow().get(raw_key) {
            return existing.clone();
        }
        let value = generate();
        self.cache.borrow_mut().insert(raw_key.to_string(), value.clone());
        value
    }
}

fn pick(pool: &[&str]) -> String {
    let idx = rand::thread_rng().gen_range(0..pool.len());
    pool[idx].to_string()
}

fn random_int(args: &[String]) -> String {
    let parsed: Option<(i64, i64)> = (|| {
        let min: i64 = args.first()?.parse().ok()?;
        let max: i64 = args.get(1)?.parse().ok()?;
        (min <= max).then_some((min, max))
    })();
    let (min, max) = parsed.unwrap_or((0, 100));
    rand::thread_rng().gen_range(min..=max).to_string()
}

/// Formats `now` per `FORMAT`. A malformed custom layout never panics: the
/// format call is isolated and falls back to an RFC 3339 rendering.
fn format_datetime<Tz: TimeZone>(now: DateTime<Tz>, fmt: Option<&str>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match fmt.map(str::trim) {
        Some("rfc1123") => now.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        Some("iso8601") => now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        Some(custom) if !custom.is_empty() => std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| now.format(custom).to_string()))
            .unwrap_or_else(|_| now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        _ => now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    }
}

fn titlecase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Evaluates a system function call to its string result. Unknown functions
/// resolve to the empty string rather than erroring, matching the resolver's
/// general policy of never failing resolution outright.
pub fn evaluate(name: &str, args: &[String], os_env: &dyn EnvGetter, dotenv: &HashMap<String, String>) -> String {
    if let Some(var_name) = name.strip_prefix("env.") {
        return os_env.get(var_name).unwrap_or_default();
    }

    let canonical = match name.strip_prefix("random.") {
        Some(rest) => format!("random{}", titlecase_first(rest)),
        None => name.to_string(),
    };

    match canonical.as_str() {
        "guid" | "uuid" => Uuid::new_v4().to_string(),
        "randomInt" => random_int(args),
        "timestamp" => Utc::now().timestamp().to_string(),
        "datetime" => format_datetime(Utc::now(), args.first().map(String::as_str)),
        "localDatetime" => format_datetime(Local::now(), args.first().map(String::as_str)),
        "processEnv" => args.first().and_then(|n| os_env.get(n)).unwrap_or_default(),
        "dotenv" => args.first().and_then(|n| dotenv.get(n).cloned()).unwrap_or_default(),
        "randomFirstName" => pick(FIRST_NAMES),
        "randomLastName" => pick(LAST_NAMES),
        "randomFullName" => format!("{} {}", pick(FIRST_NAMES), pick(LAST_NAMES)),
        "randomJobTitle" => pick(JOB_TITLES),
        "randomPhoneNumber" => format!(
            "+1-{:03}-{:03}-{:04}",
            rand::thread_rng().gen_range(200..999),
            rand::thread_rng().gen_range(200..999),
            rand::thread_rng().gen_range(0..9999)
        ),
        "randomStreetAddress" => format!("{} {}", rand::thread_rng().gen_range(1..9999), pick(STREETS)),
        "randomCity" => pick(CITIES),
        "randomState" => pick(STATES),
        "randomZipCode" => format!("{:05}", rand::thread_rng().gen_range(0..99999)),
        "randomCountry" => pick(COUNTRIES),
        "randomUrl" => format!("https://{}", pick(DOMAINS)),
        "randomDomainName" => pick(DOMAINS),
        "randomUserAgent" => pick(USER_AGENTS),
        "randomMacAddress" => {
            let mut rng = rand::thread_rng();
            (0..6)
                .map(|_| format!("{:02x}", rng.gen::<u8>()))
                .collect::<Vec<_>>()
                .join(":")
        }
        _ => String::new(),
    }
}
