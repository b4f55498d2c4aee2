//! Fixed-layout character records and their column schema.

use crate::string_ptr::StringPtr;
use std::fmt;

/// Number of comma-separated columns per line.
pub const COLUMN_COUNT: usize = 5;

/// Column position within a line, in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    Name,
    Hp,
    Mp,
    Attack,
    Defense,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Name,
        Column::Hp,
        Column::Mp,
        Column::Attack,
        Column::Defense,
    ];

    /// Column closed by the `index`-th comma of a line (0-based).
    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Hp => "hp",
            Column::Mp => "mp",
            Column::Attack => "attack",
            Column::Defense => "defense",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed line: `name,hp,mp,attack,defense`.
///
/// The record exclusively owns its `name` copy; the enclosing
/// [`RecordTable`](crate::RecordTable) owns the records.
#[derive(Debug, Default)]
pub struct Record {
    pub name: StringPtr,
    pub hp: i32,
    pub mp: i32,
    pub attack: i32,
    pub defense: i32,
}

impl Record {
    /// Frees the owned name. Idempotent.
    pub fn dispose(&mut self) {
        self.name.dispose();
    }

    /// Integer value for a numeric column, `None` for [`Column::Name`].
    pub fn int_field(&self, column: Column) -> Option<i32> {
        match column {
            Column::Name => None,
            Column::Hp => Some(self.hp),
            Column::Mp => Some(self.mp),
            Column::Attack => Some(self.attack),
            Column::Defense => Some(self.defense),
        }
    }

    /// Re-joins the fields into the source line form (without line feed).
    pub fn to_line(&self) -> Vec<u8> {
        let mut line = Vec::with_capacity(self.name.len() + 4 * 12);
        line.extend_from_slice(self.name.as_bytes());
        for value in [self.hp, self.mp, self.attack, self.defense] {
            line.push(b',');
            line.extend_from_slice(value.to_string().as_bytes());
        }
        line
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Name : {}, HP : {}, MP : {}, Attack : {}, Defense : {}",
            self.name, self.hp, self.mp, self.attack, self.defense
        )
    }
}
