mod test_end_call;
mod test_http_call;
mod test_start_failures;
mod test_two_party_call;
