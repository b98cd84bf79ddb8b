use crate::adapters::connectsafely::{
    ConnectSafelyClient, GroupMembersSource, GroupUrlMembersSource, PeopleSearchQuery,
    PeopleSearchSource,
};
use crate::config::toml_config::ExportConfig;
use crate::core::RecordSource;
use crate::domain::model::{RecordLayout, GROUP_MEMBER_LAYOUT, PEOPLE_SEARCH_LAYOUT};
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "leads-export")]
#[command(about = "Export LinkedIn group members and people searches to Google Sheets or JSON")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(long, env = "CONNECTSAFELY_API_TOKEN", hide_env_values = true, global = true)]
    pub api_token: Option<String>,

    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true, global = true)]
    pub google_access_token: Option<String>,

    #[arg(long, env = "GOOGLE_CLIENT_ID", global = true)]
    pub google_client_id: Option<String>,

    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true, global = true)]
    pub google_client_secret: Option<String>,

    #[arg(long, env = "GOOGLE_REFRESH_TOKEN", hide_env_values = true, global = true)]
    pub google_refresh_token: Option<String>,

    /// Existing spreadsheet to sync into; a new one is created when absent
    #[arg(long, env = "GOOGLE_SHEETS_SPREADSHEET_ID", global = true)]
    pub spreadsheet_id: Option<String>,

    /// Title for a newly created spreadsheet
    #[arg(long, global = true)]
    pub spreadsheet_title: Option<String>,

    /// Sheet tab name
    #[arg(long, global = true)]
    pub sheet_name: Option<String>,

    /// Write a JSON file into this directory instead of syncing a spreadsheet
    #[arg(long, global = true)]
    pub json_out: Option<String>,

    #[arg(long, global = true, requires = "json_out")]
    pub json_filename: Option<String>,

    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    #[arg(long, global = true)]
    pub max_records: Option<usize>,

    #[arg(long, global = true)]
    pub page_delay_ms: Option<u64>,

    /// Keep every record (group sources filter to premium/verified by default)
    #[arg(long, global = true, conflicts_with = "premium_only")]
    pub all: bool,

    /// Keep only premium/verified records (searches keep everything by default)
    #[arg(long, global = true)]
    pub premium_only: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, global = true, help = "Log CPU and memory per stage")]
    pub monitor: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Export(SourceCommand),

    /// Look up LinkedIn geo ids for a location name
    Locations { keywords: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum SourceCommand {
    /// Members of a LinkedIn group by id
    Group { group_id: String },

    /// Members of a LinkedIn group by URL
    GroupUrl { group_url: String },

    /// People search by keywords
    Search {
        keywords: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Turn --location into a geo id before searching
        #[arg(long, requires = "location")]
        resolve_location: bool,
    },

    /// Hiring managers and recruiters at one company
    HiringManagers {
        /// Numeric company id
        company_id: String,
        #[arg(long)]
        job_title: Option<String>,
        #[arg(long)]
        manager_title: Option<String>,
        /// Connection degrees, e.g. S,O
        #[arg(long, value_delimiter = ',')]
        connection_degree: Vec<String>,
    },
}

impl SourceCommand {
    pub fn layout(&self) -> RecordLayout {
        match self {
            Self::Group { .. } | Self::GroupUrl { .. } => GROUP_MEMBER_LAYOUT,
            Self::Search { .. } | Self::HiringManagers { .. } => PEOPLE_SEARCH_LAYOUT,
        }
    }

    pub fn build_source(&self, client: ConnectSafelyClient) -> Box<dyn RecordSource> {
        match self {
            Self::Group { group_id } => Box::new(GroupMembersSource::new(client, group_id.clone())),
            Self::GroupUrl { group_url } => {
                Box::new(GroupUrlMembersSource::new(client, group_url.clone()))
            }
            Self::Search {
                keywords,
                location,
                title,
                ..
            } => Box::new(PeopleSearchSource::new(
                client,
                PeopleSearchQuery {
                    location: location.clone(),
                    title: title.clone(),
                    ..PeopleSearchQuery::keywords(keywords.clone())
                },
            )),
            Self::HiringManagers {
                company_id,
                job_title,
                manager_title,
                connection_degree,
            } => Box::new(PeopleSearchSource::new(
                client,
                PeopleSearchQuery::hiring_managers(
                    company_id.clone(),
                    job_title.as_deref(),
                    manager_title.as_deref(),
                    connection_degree.clone(),
                ),
            )),
        }
    }
}

impl CliConfig {
    /// The export source, or `None` for the location lookup.
    pub fn source(&self) -> Option<&SourceCommand> {
        match &self.command {
            Command::Export(source) => Some(source),
            Command::Locations { .. } => None,
        }
    }

    /// Premium/verified filtering: on for group sources, off for searches,
    /// unless overridden.
    pub fn qualified_only(&self) -> bool {
        if self.all {
            return false;
        }
        if self.premium_only {
            return true;
        }
        matches!(
            self.source(),
            Some(SourceCommand::Group { .. } | SourceCommand::GroupUrl { .. })
        )
    }

    pub fn writes_json(&self) -> bool {
        self.json_out.is_some()
    }

    /// Command-line values win over the config file.
    pub fn apply_to(&self, config: &mut ExportConfig) {
        fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                target.clone_from(value);
            }
        }

        set(&mut config.connectsafely.api_token, &self.api_token);
        set(&mut config.google.access_token, &self.google_access_token);
        set(&mut config.google.client_id, &self.google_client_id);
        set(&mut config.google.client_secret, &self.google_client_secret);
        set(&mut config.google.refresh_token, &self.google_refresh_token);
        set(&mut config.sheet.spreadsheet_id, &self.spreadsheet_id);
        set(&mut config.sheet.spreadsheet_title, &self.spreadsheet_title);
        set(&mut config.json.filename, &self.json_filename);
        set(&mut config.pagination.max_records, &self.max_records);

        if let Some(sheet_name) = &self.sheet_name {
            config.sheet.sheet_name = sheet_name.clone();
        }
        if let Some(dir) = &self.json_out {
            config.json.output_dir = dir.clone();
        }
        if let Some(page_size) = self.page_size {
            config.pagination.page_size = page_size;
        }
        if let Some(delay) = self.page_delay_ms {
            config.pagination.page_delay_ms = delay;
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let source = match &self.command {
            Command::Export(source) => source,
            Command::Locations { keywords } => {
                return validation::validate_non_empty_string("keywords", keywords)
            }
        };
        match source {
            SourceCommand::Group { group_id } => {
                validation::validate_non_empty_string("group_id", group_id)
            }
            SourceCommand::GroupUrl { group_url } => validation::validate_url("group_url", group_url),
            SourceCommand::Search { keywords, .. } => {
                validation::validate_non_empty_string("keywords", keywords)
            }
            SourceCommand::HiringManagers { company_id, .. } => {
                validation::validate_non_empty_string("company_id", company_id)
            }
        }
    }
}
