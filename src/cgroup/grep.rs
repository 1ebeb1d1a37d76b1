/// Finds the first line of `data` containing `token` and returns the field at `index`
/// after splitting that line by `delimiter`, trimmed of surrounding whitespace.
///
/// Returns `None` if no line contains `token`, or if the first matching line has no
/// field at `index`.
///
/// # Examples
///
/// ```
/// # use cgroup_limits::cgroup::grep_first_match;
/// let membership = "12:cpu,cpuacct:/docker/abc\n0::/\n";
/// assert_eq!(grep_first_match(membership, "cpu,", 2, ":"), Some("/docker/abc"));
///
/// let stat = "cache 100\nhierarchical_memory_limit 536870912\n";
/// assert_eq!(grep_first_match(stat, "hierarchical_memory_limit", 1, " "), Some("536870912"));
/// ```
pub fn grep_first_match<'a>(
    data: &'a str,
    token: &str,
    index: usize,
    delimiter: &str,
) -> Option<&'a str> {
    let line = data.lines().find(|line| line.contains(token))?;
    line.split(delimiter).nth(index).map(str::trim)
}
