//! Command parsing and execution.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clinic_core::api::Method;
use clinic_core::utils::{format_date, format_datetime, format_optional, truncate_string};
use clinic_core::views::{appointment_rows, diagnosis_rows, filter_by_name};
use clinic_core::{ApiClient, Config};
use serde_json::Value;
use tracing::warn;

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "CLINIC_PASSWORD";

/// Column width for names in list output
const NAME_WIDTH: usize = 28;

pub const USAGE: &str = "\
Usage: clinic <command> [args]

Commands:
  login [username]                     Log in and store the access token
  logout                               Forget the stored token
  whoami                               Show the logged-in profile
  patients [search]                    List patients
  appointments [--month YYYY-MM | --all] [search]
                                       List appointments (default: this month)
  bills [search]                       List bills
  diagnoses [search]                   List successful diagnoses
  diagnose <patient_id> [--left IMAGE] [--right IMAGE]
                                       Upload fundus images for diagnosis
  treatments [search]                  List treatments
  delete-appointment <id>              Delete an appointment
  delete-diagnosis <id>                Delete a diagnosis
  get <path>                           GET a raw API path and print the JSON
  help                                 Show this message

Environment:
  CLINIC_API_BASE_URL                  Backend origin (overrides config.json)
  CLINIC_PASSWORD                      Password for non-interactive login
  RUST_LOG                             Log filter (default: warn)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthFilter {
    Current,
    All,
    Month(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: Option<String> },
    Logout,
    WhoAmI,
    Patients { search: String },
    Appointments { month: MonthFilter, search: String },
    Bills { search: String },
    Diagnoses { search: String },
    Treatments { search: String },
    DeleteAppointment { id: String },
    DeleteDiagnosis { id: String },
    Diagnose {
        patient_id: String,
        left: Option<PathBuf>,
        right: Option<PathBuf>,
    },
    Get { path: String },
    Help,
}

fn is_month(value: &str) -> bool {
    value.len() == 7 && NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d").is_ok()
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Help);
        };
        let search = || rest.join(" ");
        let single = |what: &str| -> Result<String> {
            match rest {
                [value] => Ok(value.clone()),
                _ => bail!("`{}` takes exactly one {}", name, what),
            }
        };

        Ok(match name.as_str() {
            "login" => Command::Login {
                username: rest.first().cloned(),
            },
            "logout" => Command::Logout,
            "whoami" => Command::WhoAmI,
            "patients" => Command::Patients { search: search() },
            "appointments" => {
                let mut month = MonthFilter::Current;
                let mut terms = Vec::new();
                let mut iter = rest.iter();
                while let Some(arg) = iter.next() {
                    match arg.as_str() {
                        "--all" => month = MonthFilter::All,
                        "--month" => {
                            let value = iter.next().context("--month needs a value (YYYY-MM)")?;
                            if !is_month(value) {
                                bail!("invalid month {:?}, expected YYYY-MM", value);
                            }
                            month = MonthFilter::Month(value.clone());
                        }
                        _ => terms.push(arg.as_str()),
                    }
                }
                Command::Appointments {
                    month,
                    search: terms.join(" "),
                }
            }
            "bills" => Command::Bills { search: search() },
            "diagnoses" => Command::Diagnoses { search: search() },
            "treatments" => Command::Treatments { search: search() },
            "delete-appointment" => Command::DeleteAppointment { id: single("id")? },
            "delete-diagnosis" => Command::DeleteDiagnosis { id: single("id")? },
            "diagnose" => {
                let mut patient_id = None;
                let mut left = None;
                let mut right = None;
                let mut iter = rest.iter();
                while let Some(arg) = iter.next() {
                    match arg.as_str() {
                        "--left" => {
                            left = Some(PathBuf::from(iter.next().context("--left needs an image path")?))
                        }
                        "--right" => {
                            right = Some(PathBuf::from(iter.next().context("--right needs an image path")?))
                        }
                        flag if flag.starts_with("--") => bail!("unknown option `{}`", flag),
                        id if patient_id.is_none() => patient_id = Some(id.to_string()),
                        extra => bail!("unexpected argument `{}`", extra),
                    }
                }
                let patient_id = patient_id.context("`diagnose` needs a patient id")?;
                if left.is_none() && right.is_none() {
                    bail!("`diagnose` needs at least one of --left or --right");
                }
                Command::Diagnose {
                    patient_id,
                    left,
                    right,
                }
            }
            "get" => {
                let path = single("path")?;
                if !path.starts_with('/') {
                    bail!("path must start with '/'");
                }
                Command::Get { path }
            }
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("unknown command `{}`", other),
        })
    }
}

fn prompt_username(default: Option<&str>) -> Result<String> {
    match default {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();
    match (input.is_empty(), default) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => bail!("Username required"),
        (false, _) => Ok(input.to_string()),
    }
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        return Ok(password);
    }
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

pub async fn run(command: Command, api: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { username } => {
            let username = match username {
                Some(username) => username,
                None => prompt_username(config.last_username.as_deref())?,
            };
            let password = read_password()?;
            if password.is_empty() {
                bail!("Password required");
            }

            api.login(&username, &password).await?;

            config.last_username = Some(username.clone());
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Logged in as {}", username);
        }
        Command::Logout => {
            api.logout().await?;
            println!("Logged out");
        }
        Command::WhoAmI => {
            let profile = api.fetch_profile().await?;
            println!("{} ({})", profile.full_name(), profile.username);
            println!("Email:          {}", profile.email);
            println!("Phone:          {}", format_optional(&profile.phone, "-"));
            println!("Role:           {}", format_optional(&profile.role, "-"));
            println!("Specialization: {}", format_optional(&profile.specialization, "-"));
        }
        Command::Patients { search } => {
            let patients = api.fetch_patients().await?;
            let rows = filter_by_name(&patients, &search);
            if rows.is_empty() {
                println!("No results");
            }
            for p in rows {
                println!(
                    "{:<8} {:<width$} {:>4} {:<6} {}",
                    p.id,
                    truncate_string(&p.full_name, NAME_WIDTH),
                    p.display_age(),
                    format_optional(&p.gender, "-"),
                    format_optional(&p.phone, "-"),
                    width = NAME_WIDTH,
                );
            }
        }
        Command::Appointments { month, search } => {
            let (appointments, bills) =
                futures::try_join!(api.fetch_appointments(), api.fetch_bills())?;
            let month = match month {
                MonthFilter::Current => Some(Local::now().format("%Y-%m").to_string()),
                MonthFilter::All => None,
                MonthFilter::Month(m) => Some(m),
            };
            let rows = appointment_rows(&appointments, &bills, month.as_deref(), &search);
            if rows.is_empty() {
                println!("No results");
            }
            for row in rows {
                let billing = match row.bill {
                    Some(bill) => format!("{} ({})", bill.amount, bill.status_display()),
                    None => "no bill".to_string(),
                };
                println!(
                    "{:<24} {:<width$} {}",
                    format_datetime(&row.appointment.appointment_datetime),
                    truncate_string(&row.appointment.patient_name, NAME_WIDTH),
                    billing,
                    width = NAME_WIDTH,
                );
            }
        }
        Command::Bills { search } => {
            let bills = api.fetch_bills().await?;
            let rows = filter_by_name(&bills, &search);
            if rows.is_empty() {
                println!("No results");
            }
            for bill in rows {
                println!(
                    "{:<width$} {:>10} {:<7} {}",
                    truncate_string(&bill.patient_name, NAME_WIDTH),
                    bill.amount,
                    bill.status_display(),
                    format_datetime(&bill.created_at),
                    width = NAME_WIDTH,
                );
            }
        }
        Command::Diagnoses { search } => {
            let (diagnoses, patients, treatments) = futures::try_join!(
                api.fetch_diagnoses(),
                api.fetch_patients(),
                api.fetch_treatments()
            )?;
            let rows = diagnosis_rows(&diagnoses, &patients, &treatments, &search);
            if rows.is_empty() {
                println!("No results");
            }
            for row in rows {
                println!(
                    "{:<width$} L: {:<16} R: {:<16} {}",
                    truncate_string(&row.patient_name, NAME_WIDTH),
                    row.left_label,
                    row.right_label,
                    if row.treatment.is_some() { "treated" } else { "untreated" },
                    width = NAME_WIDTH,
                );
            }
        }
        Command::Treatments { search } => {
            let treatments = api.fetch_treatments().await?;
            let rows = filter_by_name(&treatments, &search);
            if rows.is_empty() {
                println!("No results");
            }
            for t in rows {
                println!(
                    "{:<width$} {:<20} {:<12} {}",
                    truncate_string(&t.patient_name, NAME_WIDTH),
                    truncate_string(&t.medication, 20),
                    t.dosage,
                    t.created_at.as_deref().map(format_date).unwrap_or_default(),
                    width = NAME_WIDTH,
                );
            }
        }
        Command::DeleteAppointment { id } => {
            api.delete_appointment(&id).await?;
            println!("Deleted appointment {}", id);
        }
        Command::DeleteDiagnosis { id } => {
            api.delete_diagnosis(&id).await?;
            println!("Deleted diagnosis {}", id);
        }
        Command::Diagnose {
            patient_id,
            left,
            right,
        } => {
            let created = api
                .new_diagnosis(&patient_id, left.as_deref(), right.as_deref())
                .await?;
            match &created["id"] {
                Value::Null => println!("Submitted diagnosis for patient {}", patient_id),
                Value::String(id) => println!("Submitted diagnosis {} for patient {}", id, patient_id),
                id => println!("Submitted diagnosis {} for patient {}", id, patient_id),
            }
        }
        Command::Get { path } => {
            let body: Value = api.request(Method::GET, &path, None, None).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Help => println!("{}", USAGE),
    }
    Ok(())
}
