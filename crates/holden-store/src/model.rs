//! The holden record and its binding table.

use holden_db::{Field, Record, Setter};
use serde::{Deserialize, Serialize};

/// A persisted holden, as stored in the `holdens` table.
///
/// Field order matches the table's column order: `id`, `name`, `age`,
/// `height`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holden {
    /// Database-assigned identifier.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: i64,
    /// Height in metres.
    pub height: f64,
}

/// Parameters for creating a new holden.
///
/// Missing fields deserialize to their zero values, and any `id` supplied by
/// a client is ignored: the database assigns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewHolden {
    pub name: String,
    pub age: i64,
    pub height: f64,
}

impl NewHolden {
    /// Builds the stored record once the database has assigned an id.
    pub fn with_id(self, id: i64) -> Holden {
        Holden {
            id,
            name: self.name,
            age: self.age,
            height: self.height,
        }
    }
}

impl Record for Holden {
    const FIELDS: &'static [Field<Self>] = &[
        Field {
            name: "id",
            setter: Setter::Integer(|h, v| h.id = v),
        },
        Field {
            name: "name",
            setter: Setter::Text(|h, v| h.name = v),
        },
        Field {
            name: "age",
            setter: Setter::Integer(|h, v| h.age = v),
        },
        Field {
            name: "height",
            setter: Setter::Real(|h, v| h.height = v),
        },
    ];
}
