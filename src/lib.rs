#![forbid(unsafe_code)]

pub mod cli;
pub mod export;
pub mod formats;
pub mod html;
pub mod icons;
pub mod links;
pub mod logging;
pub mod net;
pub mod parse;
pub mod scrape;
