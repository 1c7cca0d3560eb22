use crate::core::Principal;
use chrono::{DateTime, Utc};
use kerberos_asn1::{
    AsReq, KdcReq, KerberosTime, PaData, PrincipalName, TgsReq, Ticket,
};

/// Builder of the KDC-REQ shared by the AS and TGS exchanges.
pub struct KdcReqBuilder {
    realm: String,
    sname: Option<PrincipalName>,
    etypes: Vec<i32>,
    kdc_options: u32,
    cname: Option<PrincipalName>,
    padatas: Vec<PaData>,
    nonce: u32,
    from: Option<KerberosTime>,
    till: KerberosTime,
    rtime: Option<KerberosTime>,
    additional_tickets: Vec<Ticket>,
}

impl KdcReqBuilder {
    pub fn new(realm: String, nonce: u32, till: DateTime<Utc>) -> Self {
        return Self {
            realm,
            sname: None,
            etypes: Vec::new(),
            kdc_options: 0,
            cname: None,
            padatas: Vec::new(),
            nonce,
            from: None,
            till: till.into(),
            rtime: None,
            additional_tickets: Vec::new(),
        };
    }

    pub fn kdc_options(mut self, kdc_options: u32) -> Self {
        self.kdc_options = kdc_options;
        self
    }

    pub fn add_kdc_option(mut self, kdc_option: u32) -> Self {
        self.kdc_options |= kdc_option;
        self
    }

    pub fn etypes(mut self, etypes: Vec<i32>) -> Self {
        self.etypes = etypes;
        self
    }

    pub fn cname(mut self, cname: Option<PrincipalName>) -> Self {
        self.cname = cname;
        self
    }

    pub fn sname(mut self, sname: Option<PrincipalName>) -> Self {
        self.sname = sname;
        self
    }

    pub fn server(self, server: &Principal) -> Self {
        self.sname(Some(server.name.clone()))
    }

    pub fn from(mut self, from: Option<DateTime<Utc>>) -> Self {
        self.from = from.map(|f| f.into());
        self
    }

    pub fn rtime(mut self, rtime: Option<DateTime<Utc>>) -> Self {
        self.rtime = rtime.map(|r| r.into());
        self
    }

    pub fn padatas(mut self, padatas: Vec<PaData>) -> Self {
        self.padatas = padatas;
        self
    }

    pub fn push_padata(mut self, padata: PaData) -> Self {
        self.padatas.push(padata);
        self
    }

    pub fn push_ticket(mut self, ticket: Ticket) -> Self {
        self.additional_tickets.push(ticket);
        self
    }

    pub fn build(self) -> KdcReq {
        let mut req = KdcReq::default();

        req.req_body.kdc_options = self.kdc_options.into();
        req.req_body.cname = self.cname;
        req.req_body.realm = self.realm;
        req.req_body.sname = self.sname;
        req.req_body.from = self.from;
        req.req_body.till = self.till;
        req.req_body.rtime = self.rtime;
        req.req_body.nonce = self.nonce;
        req.req_body.etypes = self.etypes;

        if self.padatas.len() > 0 {
            req.padata = Some(self.padatas);
        }

        if self.additional_tickets.len() > 0 {
            req.req_body.additional_tickets = Some(self.additional_tickets);
        }

        return req;
    }

    pub fn build_as_req(self) -> AsReq {
        self.build().into()
    }

    pub fn build_tgs_req(self) -> TgsReq {
        self.build().into()
    }
}
