//! Dataset categories and their fixed column schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Columns shared by every category, in encoding order after the identifier column.
pub const COMMON_COLUMNS: [&str; 11] = [
    "from_country",
    "to_country",
    "from_city",
    "to_city",
    "from_date",
    "to_date",
    "departure",
    "arrival",
    "economy",
    "business",
    "first_class",
];

/// Identifier column plus the common columns.
pub const COLUMN_COUNT: usize = COMMON_COLUMNS.len() + 1;

/// One of the fixed transport types. Keys every storage lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Flights,
    Bus,
    Train,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Flights, Category::Bus, Category::Train];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Flights => "flights",
            Category::Bus => "bus",
            Category::Train => "train",
        }
    }

    /// Identifier column, always the first column of a table (e.g. `flights_number`).
    pub fn id_column(&self) -> String {
        format!("{}_number", self.as_str())
    }

    /// Capitalised first letter of the identifier column, used to prefix generated ids.
    pub fn id_prefix(&self) -> char {
        match self {
            Category::Flights => 'F',
            Category::Bus => 'B',
            Category::Train => 'T',
        }
    }

    /// Full column list in encoding order.
    pub fn columns(&self) -> Vec<String> {
        self.column_names().to_vec()
    }

    pub fn column_names(&self) -> [String; COLUMN_COUNT] {
        std::array::from_fn(|i| match i {
            0 => self.id_column(),
            _ => COMMON_COLUMNS[i - 1].to_string(),
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flights" => Ok(Category::Flights),
            "bus" => Ok(Category::Bus),
            "train" => Ok(Category::Train),
            other => Err(DataError::InvalidCategory(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_categories() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "boat".parse::<Category>().unwrap_err();
        assert!(matches!(err, DataError::InvalidCategory(ref name) if name == "boat"));
        // Matching is exact, as in the stored artifact names.
        assert!("Flights".parse::<Category>().is_err());
    }

    #[test]
    fn test_id_column_leads_schema() {
        let columns = Category::Bus.columns();
        assert_eq!(columns.len(), 12);
        assert_eq!(columns[0], "bus_number");
        assert_eq!(columns[11], "first_class");
        assert_eq!(Category::Train.id_prefix(), 'T');
    }
}
