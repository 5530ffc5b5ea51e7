use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::BoundingBox;

fn number_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"-?[0-9]+").unwrap_or_else(|err| panic!("invalid number token regex: {err}"))
    })
}

/// Parses a free-form bounds descriptor such as `[x1,y1][x2,y2]`.
///
/// Every run of digits (with an optional leading minus) is a token, and the
/// surrounding punctuation is ignored. The first four tokens are read as a
/// corner pair; anything after them is ignored. Returns `None` when fewer
/// than four tokens are present or a token does not fit in an `i64`.
pub fn parse_bounds(bounds: &str) -> Option<BoundingBox> {
    let mut tokens = number_token_pattern()
        .find_iter(bounds)
        .map(|token| token.as_str().parse::<i64>());

    let mut corners = [0_i64; 4];
    for slot in &mut corners {
        match tokens.next() {
            Some(Ok(value)) => *slot = value,
            Some(Err(error)) => {
                debug!(bounds, error = %error, "bounds token out of range");
                return None;
            }
            None => return None,
        }
    }

    let [x1, y1, x2, y2] = corners;
    Some(BoundingBox::from_corners(x1, y1, x2, y2))
}
