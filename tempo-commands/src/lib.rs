pub mod slowmode;
pub mod utility;

use tempo_core::{Data, Error};

pub struct CommandMeta {
    pub name: &'static str,
    pub desc: &'static str,
    pub category: &'static str,
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandMeta] = &[
    utility::ping::META,
    utility::help::META,
    slowmode::channel::META,
    slowmode::server::META,
    slowmode::stats::META,
];

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        utility::ping::ping(),
        utility::help::help(),
        slowmode::channel::slowmodechannel(),
        slowmode::server::slowmodeserver(),
        slowmode::stats::slowmodestats(),
    ]
}
