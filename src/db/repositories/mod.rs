mod sessions;
mod warnings;
