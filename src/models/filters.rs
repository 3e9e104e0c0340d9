/// Paging for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Paging {
    /// Every matching record
    #[default]
    All,
    /// Zero-based page of `per_page` records
    Page { page: u32, per_page: u32 },
}

impl Paging {
    /// Slice an already filtered and ordered list
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        match *self {
            Paging::All => items,
            Paging::Page { page, per_page } => items
                .into_iter()
                .skip(page as usize * per_page as usize)
                .take(per_page as usize)
                .collect(),
        }
    }

    /// `(limit, offset)` for SQL, `None` when unbounded
    pub fn limit_offset(&self) -> Option<(i64, i64)> {
        match *self {
            Paging::All => None,
            Paging::Page { page, per_page } => {
                Some((i64::from(per_page), i64::from(page) * i64::from(per_page)))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterFilter {
    pub paging: Paging,
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInstallationFilter {
    /// Restrict to these ids when present
    pub ids: Option<Vec<String>>,
    pub installation_id: Option<String>,
    pub cluster_id: Option<String>,
    pub include_deleted: bool,
    pub paging: Paging,
}

impl ClusterInstallationFilter {
    pub fn for_installation(installation_id: impl Into<String>) -> Self {
        Self {
            installation_id: Some(installation_id.into()),
            ..Self::default()
        }
    }

    pub fn for_cluster(cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: Some(cluster_id.into()),
            ..Self::default()
        }
    }

    pub fn for_ids(ids: Vec<String>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    pub fn including_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}
