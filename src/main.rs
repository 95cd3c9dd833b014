// Copyright 2016 Matthew Collins
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};
use structopt::StructOpt;

use craftlink::config::ClientConfig;
use craftlink::logger::ConsoleLogger;
use craftlink::protocol::mojang::MojangSessionService;
use craftlink::server::event::{Event, EventSink};
use craftlink::server::Server;
use craftlink::world::World;

const TICK: Duration = Duration::from_millis(50);

#[derive(StructOpt, Debug)]
#[structopt(name = "craftlink")]
struct Opt {
    /// JSON config file
    #[structopt(short, long, parse(from_os_str), default_value = "craftlink.json")]
    config: PathBuf,

    /// Server to connect to, `host[:port]`
    #[structopt(short, long)]
    server: Option<String>,

    #[structopt(short, long)]
    username: Option<String>,

    /// Protocol version number
    #[structopt(short, long)]
    protocol: Option<i32>,

    /// error, warn, info, debug or trace
    #[structopt(long)]
    log_level: Option<String>,
}

struct LogEvents {
    disconnected: bool,
}

impl EventSink for LogEvents {
    fn on_event(&mut self, event: Event) {
        match event {
            Event::Chat { message, .. } => info!("<chat> {}", message),
            Event::Disconnected { reason, message } => {
                error!("Disconnected ({:?}): {}", reason, message);
                self.disconnected = true;
            }
            Event::ColumnLoaded { .. } | Event::ColumnUnloaded { .. } => {}
            Event::EntityMoved { .. } | Event::EntityRotated { .. } => {}
            other => info!("{:?}", other),
        }
    }
}

fn main() {
    let opt = Opt::from_args();
    let mut config = match ClientConfig::load(&opt.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load {}: {}", opt.config.display(), err);
            process::exit(2);
        }
    };
    if let Some(server) = opt.server {
        config.server = server;
    }
    if let Some(username) = opt.username {
        config.username = username;
    }
    if let Some(protocol) = opt.protocol {
        config.protocol_version = protocol;
    }
    if let Some(level) = opt.log_level {
        config.log_level = level;
    }
    if let Err(err) = ConsoleLogger::init(config.log_level()) {
        eprintln!("Failed to install logger: {}", err);
    }

    let mut events = LogEvents { disconnected: false };
    let session = MojangSessionService::new();
    let mut server = match Server::connect(&config, &session, &mut events) {
        Ok(server) => server,
        Err(_) => process::exit(1),
    };

    let mut world = World::new();
    let mut last_report = Instant::now();
    while server.is_connected() {
        let start = Instant::now();
        server.tick(&mut world, &mut events);
        if last_report.elapsed() >= Duration::from_secs(10) {
            info!(
                "{} columns loaded ({} sections), {} decoding",
                world.loaded_columns(),
                world.section_count(),
                server.pending_columns()
            );
            last_report = Instant::now();
        }
        if let Some(rest) = TICK.checked_sub(start.elapsed()) {
            thread::sleep(rest);
        }
    }
    if events.disconnected {
        process::exit(1);
    }
}
