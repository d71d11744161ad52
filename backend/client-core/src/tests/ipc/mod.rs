mod connection_state;
mod emitter;
mod frame_decoder;
