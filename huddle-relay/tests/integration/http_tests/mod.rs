mod test_directed_signals;
mod test_join_and_poll;
