use derive_new::new;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T> {
    Delete { value: T },
    Insert { value: T },
    Equal { value: T },
}

impl<T> Edit<T> {
    pub fn value(&self) -> &T {
        match self {
            Edit::Delete { value } | Edit::Insert { value } | Edit::Equal { value } => value,
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Edit::Equal { .. })
    }

    fn marker(&self) -> char {
        match self {
            Edit::Delete { .. } => '-',
            Edit::Insert { .. } => '+',
            Edit::Equal { .. } => ' ',
        }
    }
}

impl<T: Display> Display for Edit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.marker(), self.value())
    }
}

pub trait DiffAlgorithm<T> {
    type Table;
    type EditScript;

    fn compute_table(&self) -> Self::Table;
    fn diff(&self) -> Self::EditScript;
}

/// Longest-common-subsequence diff over two sequences.
///
/// Builds the full `(m+1) x (n+1)` table, so time and space are O(m·n).
/// Backtracking from the bottom-right corner prefers consuming a line of the
/// new side whenever `dp[i][j-1] >= dp[i-1][j]`.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct LcsDiff<'d, T> {
    a: &'d [T],
    b: &'d [T],
}

impl<T: Eq + Clone> DiffAlgorithm<T> for LcsDiff<'_, T> {
    type Table = Vec<Vec<usize>>;
    type EditScript = Vec<Edit<T>>;

    fn compute_table(&self) -> Self::Table {
        let (m, n) = (self.a.len(), self.b.len());
        let mut dp = vec![vec![0usize; n + 1]; m + 1];

        for i in 1..=m {
            for j in 1..=n {
                dp[i][j] = if self.a[i - 1] == self.b[j - 1] {
                    dp[i - 1][j - 1] + 1
                } else {
                    dp[i - 1][j].max(dp[i][j - 1])
                };
            }
        }

        dp
    }

    fn diff(&self) -> Self::EditScript {
        let dp = self.compute_table();
        let (mut i, mut j) = (self.a.len(), self.b.len());
        let mut edits = Vec::with_capacity(i.max(j));

        while i > 0 || j > 0 {
            if i > 0 && j > 0 && self.a[i - 1] == self.b[j - 1] {
                edits.push(Edit::Equal {
                    value: self.a[i - 1].clone(),
                });
                i -= 1;
                j -= 1;
            } else if j > 0 && (i == 0 || dp[i][j - 1] >= dp[i - 1][j]) {
                edits.push(Edit::Insert {
                    value: self.b[j - 1].clone(),
                });
                j -= 1;
            } else {
                edits.push(Edit::Delete {
                    value: self.a[i - 1].clone(),
                });
                i -= 1;
            }
        }

        // backtracking runs from the end of both texts
        edits.reverse();
        edits
    }
}

/// Line-by-line edit script turning `old` into `new`, in document order.
pub fn diff_lines<'t>(old: &'t str, new: &'t str) -> Vec<Edit<&'t str>> {
    let old_lines = old.lines().collect::<Vec<_>>();
    let new_lines = new.lines().collect::<Vec<_>>();

    LcsDiff::new(&old_lines, &new_lines).diff()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn file_inputs() -> (Vec<&'static str>, Vec<&'static str>) {
        (
            vec!["line1", "line2", "line3", "line4"],
            vec!["line2", "line3_modified", "line4", "line5"],
        )
    }

    #[rstest]
    fn test_diff_files(file_inputs: (Vec<&'static str>, Vec<&'static str>)) {
        let (a, b) = file_inputs;
        let result = LcsDiff::new(&a, &b).diff();
        let expected = vec![
            Edit::Delete { value: "line1" },
            Edit::Equal { value: "line2" },
            Edit::Delete { value: "line3" },
            Edit::Insert {
                value: "line3_modified",
            },
            Edit::Equal { value: "line4" },
            Edit::Insert { value: "line5" },
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_single_line_replacement() {
        assert_eq!(
            diff_lines("1", "2"),
            vec![Edit::Delete { value: "1" }, Edit::Insert { value: "2" }]
        );
    }

    #[rstest]
    #[case("", "", vec![])]
    #[case("", "a\nb\n", vec!["+a", "+b"])]
    #[case("a\nb\n", "", vec!["-a", "-b"])]
    #[case("a\nb\nc\n", "a\nc\n", vec![" a", "-b", " c"])]
    fn test_edit_rendering(#[case] old: &str, #[case] new: &str, #[case] expected: Vec<&str>) {
        let rendered = diff_lines(old, new)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        assert_eq!(rendered, expected);
    }

    fn text() -> impl Strategy<Value = String> {
        proptest::collection::vec("[a-c]{0,2}", 0..12).prop_map(|lines| lines.join("\n"))
    }

    proptest! {
        #[test]
        fn diffing_a_text_with_itself_is_all_context(x in text()) {
            prop_assert!(diff_lines(&x, &x).iter().all(|edit| !edit.is_change()));
        }

        #[test]
        fn edit_script_rebuilds_both_sides(old in text(), new in text()) {
            let edits = diff_lines(&old, &new);

            let rebuilt_old = edits
                .iter()
                .filter(|edit| !matches!(edit, Edit::Insert { .. }))
                .map(|edit| *edit.value())
                .collect::<Vec<_>>();
            let rebuilt_new = edits
                .iter()
                .filter(|edit| !matches!(edit, Edit::Delete { .. }))
                .map(|edit| *edit.value())
                .collect::<Vec<_>>();

            prop_assert_eq!(rebuilt_old, old.lines().collect::<Vec<_>>());
            prop_assert_eq!(rebuilt_new, new.lines().collect::<Vec<_>>());
        }
    }
}
