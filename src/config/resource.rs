//! Resource descriptors: one static description per table, driving SQL generation,
//! request validation and response messages for the generic CRUD handlers.

/// Storage kind of a column. Drives value coercion on bind and decoding on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// Auto-incrementing integer primary key.
    Serial,
    Integer,
    /// Bounded string (`VARCHAR(255)`).
    String,
    /// Unbounded string.
    Text,
    Timestamp,
}

#[derive(Clone, Copy, Debug)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub unique: bool,
    /// Referenced table; the referenced column is always that table's `id`.
    pub references: Option<&'static str>,
}

impl Column {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Column {
            name,
            kind,
            unique: false,
            references: None,
        }
    }

    const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    const fn references(mut self, table: &'static str) -> Self {
        self.references = Some(table);
        self
    }
}

/// Primary key column name shared by every resource.
pub const ID_COLUMN: &str = "id";
pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

#[derive(Debug)]
pub struct Resource {
    pub table: &'static str,
    /// Singular, lower case ("user"). Plural is the table name.
    pub noun: &'static str,
    pub columns: &'static [Column],
    /// Fields that must be truthy on create; also the only fields written on create.
    pub required_on_create: &'static [&'static str],
    /// Fields a PUT may change.
    pub updatable: &'static [&'static str],
    /// Whether create sets `created_at` explicitly instead of relying on the column default.
    pub stamp_created_at_on_create: bool,
}

/// Which CRUD step failed, for the client-facing 500 message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    List,
    Fetch,
    Create,
    Update,
    Delete,
}

impl Resource {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    fn title_noun(&self) -> String {
        capitalize(self.noun)
    }

    pub fn not_found_message(&self) -> String {
        format!("{} not found", self.title_noun())
    }

    pub fn deleted_message(&self) -> String {
        format!("{} deleted successfully", self.title_noun())
    }

    pub fn failure_message(&self, action: Action) -> String {
        match action {
            Action::List => format!("Failed to fetch {}", self.table),
            Action::Fetch => format!("Failed to fetch {}", self.noun),
            Action::Create => format!("Failed to create {}", self.noun),
            Action::Update => format!("Failed to update {}", self.noun),
            Action::Delete => format!("Failed to delete {}", self.noun),
        }
    }

    /// "Name and email are required" / "Title, content, and created_by are required".
    pub fn required_message(&self) -> String {
        let fields = self.required_on_create;
        let listed = match fields {
            [] => String::new(),
            [only] => only.to_string(),
            [first, second] => format!("{} and {}", first, second),
            [init @ .., last] => format!("{}, and {}", init.join(", "), last),
        };
        let verb = if fields.len() == 1 { "is" } else { "are" };
        format!("{} {} required", capitalize(&listed), verb)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub static USERS: Resource = Resource {
    table: "users",
    noun: "user",
    columns: &[
        Column::new(ID_COLUMN, ColumnKind::Serial),
        Column::new("name", ColumnKind::String),
        Column::new("email", ColumnKind::String).unique(),
        Column::new(CREATED_AT, ColumnKind::Timestamp),
        Column::new(UPDATED_AT, ColumnKind::Timestamp),
    ],
    required_on_create: &["name", "email"],
    updatable: &["name", "email"],
    stamp_created_at_on_create: false,
};

pub static POSTS: Resource = Resource {
    table: "posts",
    noun: "post",
    columns: &[
        Column::new(ID_COLUMN, ColumnKind::Serial),
        Column::new("created_by", ColumnKind::Integer).references("users"),
        Column::new("title", ColumnKind::String),
        Column::new("content", ColumnKind::Text),
        Column::new(CREATED_AT, ColumnKind::Timestamp),
        Column::new(UPDATED_AT, ColumnKind::Timestamp),
    ],
    required_on_create: &["title", "content", "created_by"],
    updatable: &["title", "content"],
    stamp_created_at_on_create: true,
};

/// Every resource, in dependency order (referenced tables first).
pub static RESOURCES: [&Resource; 2] = [&USERS, &POSTS];
