mod health;
mod my_ip;

pub use health::health_check;
pub use my_ip::{my_ip, render_ip_body};
