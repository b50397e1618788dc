use std::net;

use serde::Deserialize;

use crate::fare;

#[derive(Deserialize)]
pub struct Config {
    pub db: Db,
    pub http: Http,
    #[serde(default)]
    pub fare: fare::Rates,
}

#[derive(Deserialize)]
pub struct Db {
    pub url: String,
}

#[derive(Deserialize)]
pub struct Http {
    pub server: Server,
    pub cors: Cors,
}

#[derive(Deserialize)]
pub struct Server {
    pub addr: net::SocketAddr,
}

#[derive(Deserialize)]
pub struct Cors {
    pub allowed_origins: Vec<String>,
}
