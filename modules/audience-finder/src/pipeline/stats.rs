/// Counters from one scan. Failures here were absorbed, not fatal.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanStats {
    pub queries_scanned: u32,
    pub subreddits_seen: u32,
    pub profiles_skipped: u32,
    pub posts_seen: u32,
    pub posts_skipped: u32,
    pub comment_threads_fetched: u32,
    pub comment_matches: u32,
    pub direct_failures: u32,
    pub post_failures: u32,
    pub comment_failures: u32,
    pub communities_found: u32,
}

impl ScanStats {
    pub fn total_failures(&self) -> u32 {
        self.direct_failures + self.post_failures + self.comment_failures
    }
}

impl std::fmt::Display for ScanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Scan Complete ===")?;
        writeln!(f, "Queries scanned:     {}", self.queries_scanned)?;
        writeln!(f, "Subreddits seen:     {}", self.subreddits_seen)?;
        writeln!(f, "Profiles skipped:    {}", self.profiles_skipped)?;
        writeln!(f, "Posts seen:          {}", self.posts_seen)?;
        writeln!(f, "Posts skipped:       {}", self.posts_skipped)?;
        writeln!(f, "Comment threads:     {}", self.comment_threads_fetched)?;
        writeln!(f, "Comment matches:     {}", self.comment_matches)?;
        writeln!(f, "Communities found:   {}", self.communities_found)?;
        if self.total_failures() > 0 {
            writeln!(f, "\nSkipped calls:")?;
            writeln!(f, "  Direct search:  {}", self.direct_failures)?;
            writeln!(f, "  Post search:    {}", self.post_failures)?;
            writeln!(f, "  Comment fetch:  {}", self.comment_failures)?;
        }
        Ok(())
    }
}
