/// The configuration of the collection system
#[derive(Debug, Clone)]
pub struct Config {
    /// How many posts can occupy a pin slot in a collection at once
    pub pinned_post_cap: usize,
    /// How many media items a single post can carry
    pub media_per_post_cap: usize,
}

impl Config {
    /// Returns true if a post with the given amount of media fits the cap
    pub fn fits_media_cap(&self, count: usize) -> bool {
        count <= self.media_per_post_cap
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Matches the four pin slots clients render at the top of a collection
            pinned_post_cap: 4,
            // A post is a small album, not a dump
            media_per_post_cap: 5,
        }
    }
}
