//! Synthetic Generator - schema-conformant random rows for development feeds.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::category::{Category, COLUMN_COUNT};
use crate::error::Result;
use crate::table::RowTable;

const COUNTRIES: &[&str] = &[
    "Argentina", "Australia", "Austria", "Belgium", "Brazil", "Canada", "Chile",
    "Croatia", "Denmark", "Egypt", "Finland", "France", "Germany", "Greece",
    "Iceland", "India", "Ireland", "Italy", "Japan", "Kenya", "Mexico",
    "Morocco", "Netherlands", "New Zealand", "Norway", "Peru", "Poland",
    "Portugal", "Spain", "Sweden", "Switzerland", "Thailand", "Turkey",
    "United Kingdom", "United States", "Vietnam",
];

const CITIES: &[&str] = &[
    "Amsterdam", "Athens", "Auckland", "Barcelona", "Berlin", "Bogota", "Cairo",
    "Chicago", "Copenhagen", "Dublin", "Edinburgh", "Florence", "Hanoi",
    "Helsinki", "Istanbul", "Kyoto", "Lima", "Lisbon", "Lyon", "Madrid",
    "Manchester", "Marrakesh", "Melbourne", "Mumbai", "Nairobi", "Oslo",
    "Porto", "Reykjavik", "Santiago", "Seville", "Stockholm", "Toronto",
    "Valencia", "Vancouver", "Vienna", "Warsaw", "Zurich",
];

/// Produces synthetic rows for a category.
///
/// Dates fall in the decade containing `reference_date`. Unseeded runs stop
/// at the reference date itself; seeded runs span the whole calendar decade,
/// so a seed reproduces the same rows on any day of that decade.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    reference_date: NaiveDate,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            reference_date: Utc::now().date_naive(),
        }
    }

    pub fn with_reference_date(mut self, reference_date: NaiveDate) -> Self {
        self.reference_date = reference_date;
        self
    }

    /// Exactly `count` records in the category's column order.
    pub fn generate(&self, category: Category, count: usize, seed: Option<u64>) -> RowTable {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let window = self.date_window(seed.is_some());

        let rows = (0..count)
            .map(|_| generate_row(category, window, &mut rng))
            .collect();
        RowTable::from_fixed_rows(category.column_names(), rows)
    }

    /// Same as [`generate`](Self::generate), for a category given by name.
    pub fn generate_named(&self, category: &str, count: usize, seed: Option<u64>) -> Result<RowTable> {
        let category = category.parse::<Category>()?;
        Ok(self.generate(category, count, seed))
    }

    /// Inclusive `(first, last)` day that generated dates are drawn from.
    fn date_window(&self, seeded: bool) -> (NaiveDate, NaiveDate) {
        let decade = self.reference_date.year() / 10 * 10;
        let first = NaiveDate::from_ymd_opt(decade, 1, 1).unwrap_or(self.reference_date);
        let last = if seeded {
            NaiveDate::from_ymd_opt(decade + 9, 12, 31).unwrap_or(self.reference_date)
        } else {
            self.reference_date
        };
        (first, last.max(first))
    }
}

fn generate_row(category: Category, window: (NaiveDate, NaiveDate), rng: &mut StdRng) -> [String; COLUMN_COUNT] {
    [
        format!("{}{:06}", category.id_prefix(), rng.gen_range(0..1_000_000u32)),
        pick(COUNTRIES, rng),
        pick(COUNTRIES, rng),
        pick(CITIES, rng),
        pick(CITIES, rng),
        random_date(window, rng),
        random_date(window, rng),
        time_of_day(rng),
        time_of_day(rng),
        stepped_price(100, 1000, rng),
        stepped_price(1000, 2000, rng),
        stepped_price(2000, 3000, rng),
    ]
}

fn random_date((first, last): (NaiveDate, NaiveDate), rng: &mut StdRng) -> String {
    let span = (last - first).num_days();
    let date = first + Duration::days(rng.gen_range(0..=span));
    date.format("%Y-%m-%d").to_string()
}

fn pick(corpus: &[&str], rng: &mut StdRng) -> String {
    corpus.choose(rng).copied().unwrap_or_default().to_string()
}

fn time_of_day(rng: &mut StdRng) -> String {
    format!("{:02}:{:02}", rng.gen_range(0..24u32), rng.gen_range(0..60u32))
}

/// Uniform over `min, min + 100, ..., max`.
fn stepped_price(min: u32, max: u32, rng: &mut StdRng) -> String {
    let steps = (max - min) / 100;
    (min + rng.gen_range(0..=steps) * 100).to_string()
}
