use metrics::counter;

pub fn record_message(route: &'static str) {
    counter!("daybook_messages_total", "route" => route).increment(1);
}

pub fn record_dispatch(route: &'static str) {
    counter!("daybook_dispatched_total", "route" => route).increment(1);
}

pub fn record_error(status: u16) {
    counter!("daybook_errors_total", "status" => status.to_string()).increment(1);
}
