mod federation;
mod media;
mod room;
