// File: ./src/cli.rs
//! Command-line help and service unit rendering.

pub fn print_help(binary_name: &str) {
    println!(
        "DoList reminder service v{} - fires reminders set on your tasks",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("USAGE:");
    println!("    {} [OPTIONS]", binary_name);
    println!("    {} parse <reminder text...>", binary_name);
    println!("    {} --print-systemd-unit", binary_name);
    println!();
    println!("OPTIONS:");
    println!("    -r, --root <path>          Use a different directory for config and data.");
    println!("    -i, --interval <secs>      Seconds between checks (default: 30).");
    println!("    -d, --databases <p1,p2>    Task files to monitor, comma-separated.");
    println!("    -v, --verbose              Log statistics for every cycle.");
    println!("    --init-config              Write the effective config.toml and exit.");
    println!("    --print-systemd-unit       Print a systemd unit for this service and exit.");
    println!("    -h, --help                 Show this help message.");
    println!();
    println!("REMINDER SYNTAX:");
    println!("    today                      Today at 3 PM (tomorrow if already past)");
    println!("    tomorrow                   Tomorrow at 9 AM");
    println!("    next week                  One unit from now (week, month, year, ...)");
    println!("    2 hours, 30 min, 1 qtr     Offset from now");
    println!("    monday, fri 9am            Next occurrence of a weekday");
    println!("    25                         Next 25th of the month");
    println!("    25 dec, 25 dec/27 9pm      A calendar date, optionally with year and hour");
    println!("    2027-01-31 12:00:00        Exact date and time");
    println!("    <any of the above> repeat  Re-arm the reminder each time it fires");
    println!();
    println!("CONFIG:");
    println!("    config.toml keys: default_start_hour, check_interval_secs, reminder_cmd,");
    println!("    verbose, and [[stores]] tables with `name` and `path`.");
}

/// Renders a systemd unit that runs `exec` as `user`.
pub fn systemd_unit(exec: &str, user: &str) -> String {
    format!(
        "[Unit]
Description=DoList Reminder Service
After=network.target

[Service]
Type=simple
User={user}
ExecStart={exec}
Restart=always
RestartSec=10
StandardOutput=journal
StandardError=journal

[Install]
WantedBy=multi-user.target
"
    )
}
