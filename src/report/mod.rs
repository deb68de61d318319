pub mod table;
pub mod json;

use crate::feed::CachedFeed;

pub fn print(feed: &CachedFeed, json_output: bool) {
    if json_output {
        println!("{}", json::render(feed));
    } else {
        print!("{}", table::render(feed));
    }
}
