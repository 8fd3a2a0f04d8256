use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches a missing or non-https scheme at the start of a link
    pub static ref URL_SCHEME_REGEX: Regex = Regex::new(r"^(?:https?://)?").unwrap();
    pub static ref YOUTUBE_ID_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}
