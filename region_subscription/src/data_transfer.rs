use case_data_source::RegionMetrics;
use serde::{Deserialize, Serialize};
use shared_kernel::recipient_id::RecipientId;
use shared_kernel::region_name::RegionName;
use std::collections::BTreeSet;
use std::fmt;

/// Latest observed metrics of a tracked region and who wants to hear about it.
///
/// Field names are those of the persisted snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub cases: u64,
    pub deaths: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cases7_per_100k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_cases: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_deaths: Option<i64>,
    #[serde(default)]
    pub last_update: String,
    pub recipients: BTreeSet<RecipientId>,
}

impl RegionRecord {
    pub(crate) fn first_observation(metrics: RegionMetrics, recipient: RecipientId) -> Self {
        Self {
            cases: metrics.cases,
            deaths: metrics.deaths,
            cases7_per_100k: metrics.cases7_per_100k,
            delta_cases: Some(0),
            delta_deaths: Some(0),
            last_update: metrics.last_update,
            recipients: BTreeSet::from([recipient]),
        }
    }

    /// Replaces the metrics, keeping the recipients, and records the deltas.
    pub(crate) fn observe(&mut self, metrics: RegionMetrics) {
        self.delta_cases = Some(signed_difference(metrics.cases, self.cases));
        self.delta_deaths = Some(signed_difference(metrics.deaths, self.deaths));
        self.cases = metrics.cases;
        self.deaths = metrics.deaths;
        self.cases7_per_100k = metrics.cases7_per_100k;
        self.last_update = metrics.last_update;
    }

    pub fn describe<'a>(&'a self, name: &'a RegionName) -> RegionDescription<'a> {
        RegionDescription { name, record: self }
    }
}

fn signed_difference(new: u64, old: u64) -> i64 {
    let difference = i128::from(new) - i128::from(old);
    difference.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Telegram Markdown rendering of a region, in German like the bot's other replies.
pub struct RegionDescription<'a> {
    name: &'a RegionName,
    record: &'a RegionRecord,
}

impl fmt::Display for RegionDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.record;
        writeln!(f, "*{}*", escape_markdown(self.name.as_ref()))?;
        write!(f, "{}{} Fälle, ", record.cases, Delta(record.delta_cases))?;
        writeln!(f, "{}{} Tote,", record.deaths, Delta(record.delta_deaths))?;
        if let Some(incidence) = record.cases7_per_100k {
            writeln!(
                f,
                "{incidence:.1} Fälle pro 100.000 Einwohner in den letzten 7 Tagen"
            )?;
        }
        write!(f, "({})", record.last_update)
    }
}

struct Delta(Option<i64>);

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(delta) if delta != 0 => write!(f, " ({delta:+})"),
            _ => Ok(()),
        }
    }
}

fn escape_markdown(text: &str) -> String {
    text.chars()
        .fold(String::with_capacity(text.len()), |mut escaped, c| {
            if matches!(c, '_' | '*' | '`' | '[') {
                escaped.push('\\');
            }
            escaped.push(c);
            escaped
        })
}

/// A changed region ready to be announced to its recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionUpdate {
    pub region: RegionName,
    pub recipients: Vec<RecipientId>,
    pub description: String,
}
