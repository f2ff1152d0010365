use std::path::Path;

use crate::core::contig::Contig;
use crate::parsing::sam::ParseError;

/// Parse a Picard sequence dictionary (.dict) file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if the content is invalid.
pub fn parse_dict_file(path: &Path) -> Result<Vec<Contig>, ParseError> {
    let content = std::fs::read_to_string(path)?;
    parse_dict_text(&content)
}

/// Parse dictionary from text
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if the text is not valid dictionary format,
/// or `ParseError::TooManyContigs` if the number of contigs exceeds the maximum.
pub fn parse_dict_text(text: &str) -> Result<Vec<Contig>, ParseError> {
    // .dict files are SAM headers with only @HD and @SQ lines
    crate::parsing::sam::parse_header_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dict_text() {
        let dict = r"@HD	VN:1.6
@SQ	SN:chr20	LN:64444167	M5:0dec9660ec1efaaf33281c0d5ea2560f	UR:file:///reference/hg38.fa
@SQ	SN:chr21	LN:46709983	UR:file:///reference/hg38.fa
";

        let contigs = parse_dict_text(dict).unwrap();
        assert_eq!(contigs.len(), 2);
        assert_eq!(contigs[0], Contig::new("chr20", 64_444_167, 0));
        assert_eq!(contigs[1].index, 1);
    }
}
