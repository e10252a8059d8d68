use serde_json::Value;

/// Declarative filtered select against one table: `select` list, equality filters and a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub table: String,
    pub select: String,
    pub filters: Vec<(String, String)>,
    pub limit: Option<usize>,
}

impl TableQuery {
    pub fn new(table: &str) -> Self {
        Self { table: table.to_string(), select: "*".to_string(), filters: Vec::new(), limit: None }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Query-string pairs in the backend's REST dialect (`col=eq.value`).
    pub fn to_params(&self, with_projection: bool) -> Vec<(String, String)> {
        let mut out = Vec::with_capacity(self.filters.len() + 2);
        if with_projection {
            out.push(("select".to_string(), self.select.clone()));
        }
        for (col, val) in &self.filters {
            out.push((col.clone(), format!("eq.{}", val)));
        }
        if with_projection {
            if let Some(n) = self.limit {
                out.push(("limit".to_string(), n.to_string()));
            }
        }
        out
    }

    /// Whether a JSON row satisfies every equality filter. Used by the in-memory backend.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|(col, want)| match row.get(col) {
            Some(Value::String(s)) => s == want,
            Some(Value::Null) | None => want == "null",
            Some(other) => other.to_string() == *want,
        })
    }

    /// Apply the select list to a row. `*` keeps everything.
    pub fn project(&self, row: &Value) -> Value {
        if self.select.trim() == "*" {
            return row.clone();
        }
        let mut out = serde_json::Map::new();
        for col in self.select.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            if let Some(v) = row.get(col) {
                out.insert(col.to_string(), v.clone());
            }
        }
        Value::Object(out)
    }
}
