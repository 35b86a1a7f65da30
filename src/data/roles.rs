use std::collections::HashSet;

use super::header::flat_name;
use super::model::HeaderGroups;

// ---------------------------------------------------------------------------
// Column roles: category (X) vs measurement (Y)
// ---------------------------------------------------------------------------

/// X and Y candidates; together they cover every column exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRoles {
    pub x: Vec<String>,
    pub y: Vec<String>,
}

impl ColumnRoles {
    /// The first header group (insertion order) supplies the X columns, in
    /// its sub-label order; every other column is a Y column.
    pub fn from_primary_group(groups: &HeaderGroups, columns: &[String]) -> Self {
        let Some((primary, subs)) = groups.first() else {
            return ColumnRoles {
                x: Vec::new(),
                y: columns.to_vec(),
            };
        };

        let mut x: Vec<String> = Vec::with_capacity(subs.len());
        for sub in subs {
            let name = flat_name(primary, sub);
            if columns.contains(&name) && !x.contains(&name) {
                x.push(name);
            }
        }

        let x_set: HashSet<&str> = x.iter().map(String::as_str).collect();
        let y = columns
            .iter()
            .filter(|c| !x_set.contains(c.as_str()))
            .cloned()
            .collect();

        ColumnRoles { x, y }
    }

    /// The first column is the only X column; the rest are Y columns.
    pub fn first_column(columns: &[String]) -> Self {
        match columns.split_first() {
            Some((first, rest)) => ColumnRoles {
                x: vec![first.clone()],
                y: rest.to_vec(),
            },
            None => ColumnRoles::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::HeaderCell;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn primary_group_columns_are_x_candidates() {
        let mut groups = HeaderGroups::new();
        groups.insert(
            "Period".into(),
            vec![HeaderCell::text("Month"), HeaderCell::Absent],
        );
        groups.insert("Sales".into(), vec![HeaderCell::text("EUR")]);
        // "Period" alone comes from the absent sub-label.
        let columns = names(&["Period_Month", "Sales_EUR", "Period"]);

        let roles = ColumnRoles::from_primary_group(&groups, &columns);
        assert_eq!(roles.x, ["Period_Month", "Period"]);
        assert_eq!(roles.y, ["Sales_EUR"]);
    }

    #[test]
    fn roles_partition_the_columns() {
        let mut groups = HeaderGroups::new();
        groups.insert("A".into(), vec![HeaderCell::text("x")]);
        groups.insert("B".into(), vec![HeaderCell::text("y"), HeaderCell::text("z")]);
        let columns = names(&["A_x", "B_y", "B_z"]);

        let roles = ColumnRoles::from_primary_group(&groups, &columns);
        let mut all: Vec<_> = roles.x.iter().chain(&roles.y).cloned().collect();
        all.sort();
        assert_eq!(all, columns);
        assert!(roles.x.iter().all(|c| !roles.y.contains(c)));
    }

    #[test]
    fn first_column_heuristic() {
        let roles = ColumnRoles::first_column(&names(&["Date", "Sales", "Cost"]));
        assert_eq!(roles.x, ["Date"]);
        assert_eq!(roles.y, ["Sales", "Cost"]);
        assert_eq!(ColumnRoles::first_column(&[]), ColumnRoles::default());
    }
}
