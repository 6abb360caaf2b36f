use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "zipcn")]
#[command(version)]
#[command(about = "Zip and unzip with UTF-8 or GBK entry names", long_about = None)]
#[command(after_help = "Examples:\n  \
  zipcn -c GBK docs              compress docs/ into docs.zip with GBK names\n  \
  zipcn docs /tmp/out.zip        compress docs/ into /tmp/out.zip\n  \
  zipcn -x -c GBK -d out a.zip   extract a.zip into out/, decoding GBK names\n  \
  cat a.zip | zipcn -x           extract an archive read from standard input\n  \
  zipcn -l -v a.zip              list archive contents with sizes and dates")]
pub struct Cli {
    /// Compress: SOURCE [DEST.zip]; extract or list: [ARCHIVE.zip]
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Extract an archive (default is to compress)
    #[arg(short = 'x', conflicts_with = "list")]
    pub extract: bool,

    /// List archive contents
    #[arg(short = 'l')]
    pub list: bool,

    /// Print each entry as it is processed
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Charset of entry names inside the archive: UTF-8 or GBK
    #[arg(short = 'c', short_alias = 'e', value_name = "CHARSET", default_value = "UTF-8")]
    pub charset: String,

    /// Extract files into DIR (created if missing)
    #[arg(short = 'd', value_name = "DIR", requires = "extract")]
    pub extract_dir: Option<PathBuf>,
}
