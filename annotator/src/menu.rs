//! Interactive menu shown when no subcommand is given.
//!
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

/// What the user chose to analyze.
#[derive(Debug, Eq, PartialEq)]
pub enum Selection {
    Samples,
    File(PathBuf),
    Bucket { bucket: String, key: String },
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<String> {
    write!(output, "{question}")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().to_owned())
}

/// Ask the user what to analyze. Returns `None` if the selection was cancelled or incomplete.
pub fn select<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<Option<Selection>> {
    writeln!(output, "\nChoose an option:")?;
    writeln!(output, "1. Test with sample images from the internet")?;
    writeln!(output, "2. Test with your own image file")?;
    writeln!(output, "3. Test with images from an S3 bucket")?;

    let selection = match prompt(input, output, "Enter choice (1, 2, or 3): ")?.as_str() {
        "1" => {
            writeln!(
                output,
                "\nThis will download and analyze sample images from the internet"
            )?;
            match prompt(input, output, "Continue? (y/n): ")?.to_lowercase().as_str() {
                "y" => Some(Selection::Samples),
                _ => {
                    writeln!(output, "Sample test cancelled")?;
                    None
                }
            }
        }
        "2" => match prompt(input, output, "Enter the path to your image file: ")? {
            path if path.is_empty() => {
                writeln!(output, "No image path provided")?;
                None
            }
            path => Some(Selection::File(PathBuf::from(path))),
        },
        "3" => {
            let bucket = prompt(input, output, "Enter the S3 bucket name: ")?;
            let key = prompt(
                input,
                output,
                "Enter the S3 object key (name of the file) or type \"all\" for all images: ",
            )?;
            if bucket.is_empty() || key.is_empty() {
                writeln!(output, "Bucket name or object key not provided")?;
                None
            } else {
                Some(Selection::Bucket { bucket, key })
            }
        }
        _ => {
            writeln!(output, "Invalid choice")?;
            None
        }
    };

    Ok(selection)
}

/// Block until the user presses Enter.
pub fn wait_for_enter<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<()> {
    prompt(input, output, "\nPress Enter to continue to next image...")?;
    Ok(())
}
