use nom::{
    bytes::complete::{tag, take, take_till},
    combinator::{all_consuming, map},
    multi::many0,
    number::complete::le_u16,
    sequence::pair,
    IResult,
};

/// Checks that a configuration reply starts with the echoed query and takes the text field up
/// to the first NUL byte
pub fn parameter_reply<'a>(echo: &[u8], input: &'a [u8]) -> IResult<&'a [u8], &'a [u8]> {
    let (input, _) = tag(echo)(input)?;
    take_till(|b| b == 0x00)(input)
}

/// Spectrum payload made of consecutive little-endian pixels
pub fn little_endian_samples(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    all_consuming(many0(le_u16))(input)
}

/// Spectrum payload made of packet pairs, low bytes of a pixel run followed by their high bytes
pub fn split_packet_samples(input: &[u8], packet_size: usize) -> IResult<&[u8], Vec<u16>> {
    let packet_pair = map(
        pair(take(packet_size), take(packet_size)),
        |(lsb, msb): (&[u8], &[u8])| {
            lsb.iter()
                .zip(msb)
                .map(|(l, m)| u16::from_le_bytes([*l, *m]))
                .collect::<Vec<u16>>()
        },
    );
    map(all_consuming(many0(packet_pair)), |runs| runs.concat())(input)
}
