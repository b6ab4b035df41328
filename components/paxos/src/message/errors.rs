quick_error! {
    /// ProtocolError is a malformed or unexpected message on the wire.
    #[derive(Debug, Eq, PartialEq)]
    pub enum ProtocolError {
        UnknownOpKind(kind: i32) {
            display("unknown operation kind: {}", kind)
        }

        LackOf(field: String) {
            display("lack of required field:{}", field)
        }

        UnexpectedReply(want: &'static str) {
            display("expect a {} reply", want)
        }

        Decode(e: prost::DecodeError) {
            from(e: prost::DecodeError) -> (e)
            display("decode: {}", e)
        }
    }
}
