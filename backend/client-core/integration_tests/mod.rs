mod helpers;
mod ipc;
mod service;
mod session;
