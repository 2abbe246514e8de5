use {
    super::messages::*,
    crate::error::PositionError,
    nom::{
        bytes::complete::{tag, tag_no_case, take_until, take_while},
        character::complete::anychar,
        combinator::map_res,
        error::{FromExternalError, ParseError},
        sequence::{preceded, separated_pair, tuple},
        FindSubstring, IResult, InputLength, InputTake, Parser,
    },
    std::num::{ParseFloatError, ParseIntError},
    tracing::warn,
};

const WORK_OFFSET_PREFIXES: [&str; WORK_OFFSET_COUNT] = ["[G54:", "[G55:", "[G56:", "[G57:", "[G58:"];

/*
    Prefix comparison used by both classification tables. The prefix is cut down to the
    line's length first, so short lines compare against the start of each prefix.
*/
fn truncated_prefix_match(line: &str, prefix: &str) -> bool {
    let length = prefix.len().min(line.len());
    line.as_bytes()[..length] == prefix.as_bytes()[..length]
}

pub fn classify(line: &str) -> MessageKind {
    MessageKind::PREFIXES
        .iter()
        .find(|(prefix, _)| truncated_prefix_match(line, prefix))
        .map_or(MessageKind::Invalid, |(_, kind)| *kind)
}

pub fn parse_machine_state(token: &str) -> MachineState {
    MachineState::ALL
        .iter()
        .find(|state| truncated_prefix_match(token, state.name()))
        .copied()
        .unwrap_or_default()
}

pub fn take_until_or_all<T, Input, Error: ParseError<Input>>(
    tag: T,
) -> impl Fn(Input) -> IResult<Input, Input, Error>
where
    Input: InputTake + InputLength + FindSubstring<T>,
    T: InputLength + Clone,
{
    move |input| {
        let size = match input.find_substring(tag.clone()) {
            Some(offset) => offset,
            None => input.input_len(),
        };
        let (suffix, prefix) = input.take_split(size);
        Ok((suffix, prefix))
    }
}

fn parse_f64<'a, Error: 'a + ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, f64, Error>
where
    Error: FromExternalError<&'a str, ParseFloatError>,
{
    map_res(
        take_while(|c: char| c.is_ascii_digit() || c == '.' || c == '-'),
        |substr: &str| substr.parse::<f64>(),
    )
    .parse(input)
}
fn parse_u64<'a, Error: 'a + ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, u64, Error>
where
    Error: FromExternalError<&'a str, ParseIntError>,
{
    map_res(take_while(|c: char| c.is_ascii_digit()), |substr: &str| {
        substr.parse::<u64>()
    })
    .parse(input)
}

// Three numbers, each pair split by exactly one delimiter character; anything after the third is left over.
pub fn parse_position<'a, Error: 'a + ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, Position, Error>
where
    Error: FromExternalError<&'a str, ParseFloatError>,
{
    tuple((parse_f64, anychar, parse_f64, anychar, parse_f64))
        .map(|(x, _, y, _, z)| Position { x, y, z })
        .parse(input)
}
pub fn position_from_str(input: &str) -> Result<Position, PositionError> {
    parse_position::<()>(input)
        .map(|(_rest, position)| position)
        .map_err(|_| PositionError(input.to_string()))
}

fn parse_report_field<'a, Error: 'a + ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, (&'a str, &'a str), Error> {
    separated_pair(take_until(":"), tag(":"), take_until_or_all("|")).parse(input)
}

/*
    "<State|Key:value|Key:value...>". Needs at least one '|'; stops quietly at the first field
    without a ':'. Only MPos is used.
*/
pub fn parse_report(line: &str) -> Option<StatusReport> {
    let body = line.strip_prefix('<')?;
    let (state_token, mut fields) = body.split_once('|')?;
    let mut report = StatusReport {
        state: parse_machine_state(state_token),
        machine_position: None,
    };
    while let Ok((rest, (key, value))) = parse_report_field::<()>(fields) {
        if key == "MPos" {
            match position_from_str(value) {
                Ok(position) => report.machine_position = Some(position),
                Err(error) => warn!("ignoring report position: {}", error),
            }
        }
        match rest.strip_prefix('|') {
            Some(rest) => fields = rest,
            None => break,
        }
    }
    Some(report)
}

// "[G54:x,y,z]" through "[G58:...]". Other feedback lines give Ok(None).
pub fn parse_feedback(line: &str) -> Result<Option<WorkOffset>, PositionError> {
    for (index, prefix) in WORK_OFFSET_PREFIXES.iter().enumerate() {
        if let Some(rest) = line.strip_prefix(prefix) {
            let offset = position_from_str(rest)?;
            return Ok(Some(WorkOffset { index, offset }));
        }
    }
    Ok(None)
}

pub fn parse_error_code(line: &str) -> Option<u64> {
    preceded(tag("error:"), parse_u64::<()>)
        .parse(line)
        .ok()
        .map(|(_, code)| code)
}
pub fn parse_alarm_code(line: &str) -> Option<u64> {
    preceded(tag_no_case("alarm:"), parse_u64::<()>)
        .parse(line)
        .ok()
        .map(|(_, code)| code)
}
